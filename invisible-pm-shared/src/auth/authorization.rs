/// Role-based access control
///
/// Every workspace membership carries one of four roles. Each role maps to a
/// fixed set of permissions; handlers ask for a permission, never for a role.
///
/// | Permission            | Admin | PM | Consultor | Cliente |
/// |-----------------------|:-----:|:--:|:---------:|:-------:|
/// | `project:create`      |   x   | x  |           |         |
/// | `project:read`        |   x   | x  |     x     |    x    |
/// | `project:update`      |   x   | x  |           |         |
/// | `project:delete`      |   x   |    |           |         |
/// | `task:create`         |   x   | x  |           |         |
/// | `task:read`           |   x   | x  |     x     |    x    |
/// | `task:update`         |   x   | x  |   own     |         |
/// | `task:delete`         |   x   | x  |           |         |
/// | `task:assign`         |   x   | x  |           |         |
/// | `time-entry:create`   |   x   | x  |     x     |         |
/// | `time-entry:read`     |   x   | x  |     x     |         |
/// | `time-entry:read-all` |   x   | x  |           |         |
/// | `time-entry:delete`   |   x   | x  |   own     |         |
/// | `user:read`           |   x   | x  |     x     |         |
/// | `user:manage`         |   x   |    |           |         |
/// | `workspace:manage`    |   x   |    |           |         |
/// | `budget:read`         |   x   | x  |           |         |
///
/// "own" rows are granted by the table and narrowed by the handler
/// (see [`require_task_update`]).
///
/// # Example
///
/// ```
/// use invisible_pm_shared::auth::authorization::{require_permission, Permission, Role};
/// use invisible_pm_shared::auth::middleware::AuthContext;
/// use uuid::Uuid;
///
/// let ctx = AuthContext::new(Uuid::new_v4(), Uuid::new_v4(), Role::Cliente);
/// assert!(require_permission(&ctx, Permission::ProjectRead).is_ok());
/// assert!(require_permission(&ctx, Permission::BudgetRead).is_err());
/// ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::middleware::AuthContext;

/// Workspace role, stored in `workspace_users.role`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "workspace_role")]
pub enum Role {
    Admin,
    #[sqlx(rename = "PM")]
    #[serde(rename = "PM")]
    Pm,
    Consultor,
    Cliente,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    #[serde(rename = "project:create")]
    ProjectCreate,
    #[serde(rename = "project:read")]
    ProjectRead,
    #[serde(rename = "project:update")]
    ProjectUpdate,
    #[serde(rename = "project:delete")]
    ProjectDelete,
    #[serde(rename = "task:create")]
    TaskCreate,
    #[serde(rename = "task:read")]
    TaskRead,
    #[serde(rename = "task:update")]
    TaskUpdate,
    #[serde(rename = "task:delete")]
    TaskDelete,
    #[serde(rename = "task:assign")]
    TaskAssign,
    #[serde(rename = "time-entry:create")]
    TimeEntryCreate,
    #[serde(rename = "time-entry:read")]
    TimeEntryRead,
    #[serde(rename = "time-entry:read-all")]
    TimeEntryReadAll,
    #[serde(rename = "time-entry:delete")]
    TimeEntryDelete,
    #[serde(rename = "user:read")]
    UserRead,
    #[serde(rename = "user:manage")]
    UserManage,
    #[serde(rename = "workspace:manage")]
    WorkspaceManage,
    #[serde(rename = "budget:read")]
    BudgetRead,
}

use Permission::*;

const ADMIN: &[Permission] = &[
    ProjectCreate, ProjectRead, ProjectUpdate, ProjectDelete,
    TaskCreate, TaskRead, TaskUpdate, TaskDelete, TaskAssign,
    TimeEntryCreate, TimeEntryRead, TimeEntryReadAll, TimeEntryDelete,
    UserRead, UserManage,
    WorkspaceManage,
    BudgetRead,
];

const PM: &[Permission] = &[
    ProjectCreate, ProjectRead, ProjectUpdate,
    TaskCreate, TaskRead, TaskUpdate, TaskDelete, TaskAssign,
    TimeEntryCreate, TimeEntryRead, TimeEntryReadAll, TimeEntryDelete,
    UserRead,
    BudgetRead,
];

const CONSULTOR: &[Permission] = &[
    ProjectRead,
    TaskRead, TaskUpdate,
    TimeEntryCreate, TimeEntryRead, TimeEntryDelete,
    UserRead,
];

const CLIENTE: &[Permission] = &[ProjectRead, TaskRead];

impl Role {
    pub const ALL: [Role; 4] = [Role::Admin, Role::Pm, Role::Consultor, Role::Cliente];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Pm => "PM",
            Role::Consultor => "Consultor",
            Role::Cliente => "Cliente",
        }
    }

    /// Lenient parse used for request bodies; unknown names yield `None`
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.as_str() == s)
    }

    pub fn permissions(&self) -> &'static [Permission] {
        match self {
            Role::Admin => ADMIN,
            Role::Pm => PM,
            Role::Consultor => CONSULTOR,
            Role::Cliente => CLIENTE,
        }
    }

    pub fn has(&self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }

    /// Human-readable description shown on the roles screen
    pub fn description(&self) -> &'static str {
        match self {
            Role::Admin => "Administrador del workspace. Acceso total a configuración, usuarios y todos los módulos.",
            Role::Pm => "Project Manager. Gestiona proyectos, asigna tareas, ve presupuestos y reportes.",
            Role::Consultor => "Miembro del equipo. Ve sus tareas asignadas, registra horas y actualiza progreso.",
            Role::Cliente => "Vista de solo lectura. Acceso limitado al estado general del proyecto y entregables.",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::parse(s).ok_or_else(|| AuthzError::UnknownRole(s.to_string()))
    }
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectCreate => "project:create",
            ProjectRead => "project:read",
            ProjectUpdate => "project:update",
            ProjectDelete => "project:delete",
            TaskCreate => "task:create",
            TaskRead => "task:read",
            TaskUpdate => "task:update",
            TaskDelete => "task:delete",
            TaskAssign => "task:assign",
            TimeEntryCreate => "time-entry:create",
            TimeEntryRead => "time-entry:read",
            TimeEntryReadAll => "time-entry:read-all",
            TimeEntryDelete => "time-entry:delete",
            UserRead => "user:read",
            UserManage => "user:manage",
            WorkspaceManage => "workspace:manage",
            BudgetRead => "budget:read",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    #[error("Missing permission: {0}")]
    Forbidden(Permission),

    #[error("Not a member of workspace {0}")]
    NotMember(Uuid),

    #[error("Only the assignee can update this task")]
    NotAssignee,

    #[error("Unknown role: {0}")]
    UnknownRole(String),
}

/// Fails with `AuthzError::Forbidden` unless the session's role grants `permission`
pub fn require_permission(ctx: &AuthContext, permission: Permission) -> Result<(), AuthzError> {
    if ctx.role.has(permission) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(permission))
    }
}

/// `task:update` plus the Consultor ownership rule
///
/// Consultores may only touch tasks currently assigned to them.
pub fn require_task_update(ctx: &AuthContext, assignee_id: Option<Uuid>) -> Result<(), AuthzError> {
    require_permission(ctx, TaskUpdate)?;

    if ctx.role == Role::Consultor && assignee_id != Some(ctx.user_id) {
        return Err(AuthzError::NotAssignee);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(role: Role) -> AuthContext {
        AuthContext::new(Uuid::new_v4(), Uuid::new_v4(), role)
    }

    #[test]
    fn test_admin_has_everything() {
        assert_eq!(Role::Admin.permissions().len(), 17);
    }

    #[test]
    fn test_pm_lacks_destructive_and_admin_permissions() {
        for p in [ProjectDelete, UserManage, WorkspaceManage] {
            assert!(!Role::Pm.has(p), "PM should not have {p}");
        }
        assert_eq!(Role::Pm.permissions().len(), 14);
        assert!(Role::Pm.has(BudgetRead));
        assert!(Role::Pm.has(TaskAssign));
    }

    #[test]
    fn test_consultor_table() {
        let expected = [
            ProjectRead,
            TaskRead,
            TaskUpdate,
            TimeEntryCreate,
            TimeEntryRead,
            TimeEntryDelete,
            UserRead,
        ];
        assert_eq!(Role::Consultor.permissions(), &expected);
        assert!(!Role::Consultor.has(BudgetRead));
        assert!(!Role::Consultor.has(TimeEntryReadAll));
    }

    #[test]
    fn test_cliente_is_read_only() {
        assert_eq!(Role::Cliente.permissions(), &[ProjectRead, TaskRead]);
    }

    #[test]
    fn test_role_names_round_trip() {
        for role in Role::ALL {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("pm"), None);
        assert!("Owner".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_serializes_as_stored_name() {
        assert_eq!(serde_json::to_string(&Role::Pm).unwrap(), "\"PM\"");
        assert_eq!(
            serde_json::to_string(&TimeEntryReadAll).unwrap(),
            "\"time-entry:read-all\""
        );
    }

    #[test]
    fn test_require_permission() {
        assert!(require_permission(&ctx(Role::Pm), BudgetRead).is_ok());
        assert!(matches!(
            require_permission(&ctx(Role::Consultor), BudgetRead),
            Err(AuthzError::Forbidden(BudgetRead))
        ));
    }

    #[test]
    fn test_consultor_only_updates_assigned_tasks() {
        let consultor = ctx(Role::Consultor);
        assert!(require_task_update(&consultor, Some(consultor.user_id)).is_ok());
        assert!(matches!(
            require_task_update(&consultor, Some(Uuid::new_v4())),
            Err(AuthzError::NotAssignee)
        ));
        assert!(require_task_update(&consultor, None).is_err());

        let pm = ctx(Role::Pm);
        assert!(require_task_update(&pm, None).is_ok());
        assert!(require_task_update(&ctx(Role::Cliente), None).is_err());
    }
}
