//! Permission catalog
//!
//! The full list of grantable permissions and the default grants of every
//! built-in role. This is pure data: the seeder materializes it into the
//! store and tests compare against it. Grants are sets, order carries no
//! meaning.

use std::collections::BTreeSet;

/// A catalog permission, identified by `module:action`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionDef {
    pub module: &'static str,
    pub action: &'static str,
}

impl PermissionDef {
    const fn new(module: &'static str, action: &'static str) -> Self {
        Self { module, action }
    }

    /// Permission code, e.g. `tasks:read`
    pub fn code(&self) -> String {
        format!("{}:{}", self.module, self.action)
    }
}

/// Every permission known to the application
pub const PERMISSIONS: &[PermissionDef] = &[
    // Users & roles
    PermissionDef::new("users", "create"),
    PermissionDef::new("users", "read"),
    PermissionDef::new("users", "update"),
    PermissionDef::new("users", "delete"),
    PermissionDef::new("users", "manage_roles"),
    // Departments
    PermissionDef::new("departments", "create"),
    PermissionDef::new("departments", "read"),
    PermissionDef::new("departments", "update"),
    PermissionDef::new("departments", "delete"),
    // Projects
    PermissionDef::new("projects", "create"),
    PermissionDef::new("projects", "read"),
    PermissionDef::new("projects", "update"),
    PermissionDef::new("projects", "delete"),
    PermissionDef::new("projects", "manage_members"),
    // Epics & milestones
    PermissionDef::new("epics", "create"),
    PermissionDef::new("epics", "read"),
    PermissionDef::new("epics", "update"),
    PermissionDef::new("epics", "delete"),
    PermissionDef::new("milestones", "create"),
    PermissionDef::new("milestones", "read"),
    PermissionDef::new("milestones", "update"),
    PermissionDef::new("milestones", "delete"),
    // Tasks
    PermissionDef::new("tasks", "create"),
    PermissionDef::new("tasks", "create_in_project"),
    PermissionDef::new("tasks", "create_orphan"),
    PermissionDef::new("tasks", "read"),
    PermissionDef::new("tasks", "update"),
    PermissionDef::new("tasks", "delete"),
    PermissionDef::new("tasks", "assign"),
    // Events
    PermissionDef::new("events", "create"),
    PermissionDef::new("events", "read"),
    PermissionDef::new("events", "update"),
    PermissionDef::new("events", "delete"),
    // Time tracking
    PermissionDef::new("time_tracking", "create"),
    PermissionDef::new("time_tracking", "read"),
    PermissionDef::new("time_tracking", "update"),
    PermissionDef::new("time_tracking", "delete"),
    PermissionDef::new("time_tracking", "read_all"),
    // Leaves
    PermissionDef::new("leaves", "create"),
    PermissionDef::new("leaves", "read"),
    PermissionDef::new("leaves", "update"),
    PermissionDef::new("leaves", "delete"),
    PermissionDef::new("leaves", "approve"),
    // Telework
    PermissionDef::new("telework", "create"),
    PermissionDef::new("telework", "read"),
    PermissionDef::new("telework", "update"),
    PermissionDef::new("telework", "delete"),
    PermissionDef::new("telework", "manage_others"),
    // Skills
    PermissionDef::new("skills", "create"),
    PermissionDef::new("skills", "read"),
    PermissionDef::new("skills", "update"),
    PermissionDef::new("skills", "delete"),
    PermissionDef::new("skills", "manage_matrix"),
    // Documents
    PermissionDef::new("documents", "create"),
    PermissionDef::new("documents", "read"),
    PermissionDef::new("documents", "update"),
    PermissionDef::new("documents", "delete"),
    // Comments
    PermissionDef::new("comments", "create"),
    PermissionDef::new("comments", "read"),
    PermissionDef::new("comments", "update"),
    PermissionDef::new("comments", "delete"),
    // Holidays
    PermissionDef::new("holidays", "create"),
    PermissionDef::new("holidays", "read"),
    PermissionDef::new("holidays", "update"),
    PermissionDef::new("holidays", "delete"),
    // Analytics
    PermissionDef::new("analytics", "read"),
    PermissionDef::new("analytics", "export"),
    // Settings
    PermissionDef::new("settings", "read"),
    PermissionDef::new("settings", "update"),
];

/// How a built-in role derives its grants from the catalog
#[derive(Debug, Clone, Copy)]
pub enum Grant {
    /// Every catalog permission
    All,
    /// Every catalog permission except the listed codes
    AllExcept(&'static [&'static str]),
    /// Every catalog permission with this action
    Action(&'static str),
    /// Exactly the listed codes
    Only(&'static [&'static str]),
}

/// A built-in (system) role
#[derive(Debug, Clone, Copy)]
pub struct RoleDef {
    pub code: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub is_default: bool,
    pub grant: Grant,
}

impl RoleDef {
    /// The permission codes this role is granted by default
    pub fn permission_codes(&self) -> BTreeSet<String> {
        match self.grant {
            Grant::All => PERMISSIONS.iter().map(PermissionDef::code).collect(),
            Grant::AllExcept(excluded) => PERMISSIONS
                .iter()
                .map(PermissionDef::code)
                .filter(|code| !excluded.contains(&code.as_str()))
                .collect(),
            Grant::Action(action) => PERMISSIONS
                .iter()
                .filter(|p| p.action == action)
                .map(PermissionDef::code)
                .collect(),
            Grant::Only(codes) => codes.iter().map(|c| c.to_string()).collect(),
        }
    }
}

const MANAGER_PERMISSIONS: &[&str] = &[
    "users:read",
    "departments:read",
    "projects:create",
    "projects:read",
    "projects:update",
    "projects:delete",
    "projects:manage_members",
    "epics:create",
    "epics:read",
    "epics:update",
    "epics:delete",
    "milestones:create",
    "milestones:read",
    "milestones:update",
    "milestones:delete",
    "tasks:create",
    "tasks:create_in_project",
    "tasks:create_orphan",
    "tasks:read",
    "tasks:update",
    "tasks:delete",
    "tasks:assign",
    "events:create",
    "events:read",
    "events:update",
    "events:delete",
    "time_tracking:create",
    "time_tracking:read",
    "time_tracking:update",
    "time_tracking:delete",
    "time_tracking:read_all",
    "documents:create",
    "documents:read",
    "documents:update",
    "documents:delete",
    "comments:create",
    "comments:read",
    "comments:update",
    "comments:delete",
    "leaves:create",
    "leaves:read",
    "telework:create",
    "telework:read",
    "skills:read",
    "holidays:read",
    "analytics:read",
];

// Same scope as MANAGER without project deletion.
const CHEF_DE_PROJET_PERMISSIONS: &[&str] = &[
    "users:read",
    "departments:read",
    "projects:create",
    "projects:read",
    "projects:update",
    "projects:manage_members",
    "epics:create",
    "epics:read",
    "epics:update",
    "epics:delete",
    "milestones:create",
    "milestones:read",
    "milestones:update",
    "milestones:delete",
    "tasks:create",
    "tasks:create_in_project",
    "tasks:create_orphan",
    "tasks:read",
    "tasks:update",
    "tasks:delete",
    "tasks:assign",
    "events:create",
    "events:read",
    "events:update",
    "events:delete",
    "time_tracking:create",
    "time_tracking:read",
    "time_tracking:update",
    "time_tracking:delete",
    "time_tracking:read_all",
    "documents:create",
    "documents:read",
    "documents:update",
    "documents:delete",
    "comments:create",
    "comments:read",
    "comments:update",
    "comments:delete",
    "leaves:create",
    "leaves:read",
    "telework:create",
    "telework:read",
    "skills:read",
    "holidays:read",
    "analytics:read",
];

const REFERENT_TECHNIQUE_PERMISSIONS: &[&str] = &[
    "projects:read",
    "tasks:create_in_project",
    "tasks:read",
    "tasks:update",
    "skills:create",
    "skills:read",
    "skills:update",
    "skills:delete",
    "skills:manage_matrix",
];

const CONTRIBUTEUR_PERMISSIONS: &[&str] = &[
    "tasks:create_orphan",
    "tasks:read",
    "tasks:update",
    "events:create",
    "events:read",
    "events:update",
    "time_tracking:create",
    "time_tracking:read",
    "leaves:create",
    "leaves:read",
    "telework:create",
    "telework:read",
];

/// Built-in roles, seeded as system roles
pub const ROLES: &[RoleDef] = &[
    RoleDef {
        code: "ADMIN",
        name: "Administrateur",
        description: "Full access to every feature",
        is_default: false,
        grant: Grant::All,
    },
    RoleDef {
        code: "RESPONSABLE",
        name: "Responsable",
        description: "Full access except role management and settings changes",
        is_default: false,
        grant: Grant::AllExcept(&["users:manage_roles", "settings:update"]),
    },
    RoleDef {
        code: "MANAGER",
        name: "Manager",
        description: "Manages projects, tasks, events, time tracking and documents",
        is_default: false,
        grant: Grant::Only(MANAGER_PERMISSIONS),
    },
    RoleDef {
        code: "CHEF_DE_PROJET",
        name: "Chef de projet",
        description: "Leads projects and their tasks, events and documents",
        is_default: false,
        grant: Grant::Only(CHEF_DE_PROJET_PERMISSIONS),
    },
    RoleDef {
        code: "REFERENT_TECHNIQUE",
        name: "Référent technique",
        description: "Creates tasks inside projects and manages skills",
        is_default: false,
        grant: Grant::Only(REFERENT_TECHNIQUE_PERMISSIONS),
    },
    RoleDef {
        code: "CONTRIBUTEUR",
        name: "Contributeur",
        description: "Works on own tasks, time tracking, leaves and telework",
        is_default: true,
        grant: Grant::Only(CONTRIBUTEUR_PERMISSIONS),
    },
    RoleDef {
        code: "OBSERVATEUR",
        name: "Observateur",
        description: "Read-only access",
        is_default: false,
        grant: Grant::Action("read"),
    },
];

/// Look up a built-in role by code (case-insensitive)
pub fn role(code: &str) -> Option<&'static RoleDef> {
    ROLES.iter().find(|r| r.code.eq_ignore_ascii_case(code))
}

/// Every catalog permission code
pub fn all_permission_codes() -> BTreeSet<String> {
    PERMISSIONS.iter().map(PermissionDef::code).collect()
}
