//! Project selection side feed and the root access channel.
//!
//! A simpler subscribe/unsubscribe data feed that rides the same
//! connections as the game: subscribers get the current project list,
//! a rooted connection may lock or unlock entries.

use std::collections::HashSet;

use tracing::info;
use uuid::Uuid;

use crate::ws::protocol::{ProjectPreviewDto, ProjectSelectionDto, RootMessageDto};

/// Catalog of project previews plus per-connection root status.
pub struct ProjectCatalog {
    previews: Vec<ProjectPreviewDto>,
    rooted: HashSet<Uuid>,
    root_password: Option<String>,
}

impl ProjectCatalog {
    pub fn new(root_password: Option<String>) -> Self {
        Self {
            previews: vec![
                preview(1, "First", true),
                preview(2, "Second", true),
                preview(3, "Third", false),
            ],
            rooted: HashSet::new(),
            root_password,
        }
    }

    /// Feed payload as seen by one connection.
    pub fn selection_for(&self, conn_id: Uuid) -> ProjectSelectionDto {
        ProjectSelectionDto {
            is_root: self.rooted.contains(&conn_id),
            previews: self.previews.clone(),
        }
    }

    /// Root request: accepted only when a password is configured and
    /// matches.
    pub fn request_root(&mut self, conn_id: Uuid, password: &str) -> RootMessageDto {
        match &self.root_password {
            Some(expected) if expected == password => {
                self.rooted.insert(conn_id);
                info!(conn_id = %conn_id, "Root access granted");
                RootMessageDto::RootRequestAccepted
            }
            _ => RootMessageDto::RootRequestDenied,
        }
    }

    pub fn request_unroot(&mut self, conn_id: Uuid) -> RootMessageDto {
        if self.rooted.remove(&conn_id) {
            RootMessageDto::Unrooted
        } else {
            RootMessageDto::PermissionDenied
        }
    }

    /// Lock or unlock a project. Non-rooted callers and unknown project
    /// numbers are refused.
    pub fn set_project_open(&mut self, conn_id: Uuid, num: u32, open: bool) -> RootMessageDto {
        if !self.rooted.contains(&conn_id) {
            return RootMessageDto::PermissionDenied;
        }
        match self.previews.iter_mut().find(|p| p.num == num) {
            Some(project) => {
                project.is_open = open;
                if open {
                    RootMessageDto::ProjectUnlocked
                } else {
                    RootMessageDto::ProjectLocked
                }
            }
            None => RootMessageDto::PermissionDenied,
        }
    }

    /// Drop all per-connection state on disconnect.
    pub fn forget(&mut self, conn_id: Uuid) {
        self.rooted.remove(&conn_id);
    }
}

fn preview(num: u32, name: &str, is_open: bool) -> ProjectPreviewDto {
    ProjectPreviewDto {
        num,
        name: name.to_string(),
        is_open,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_request_checks_the_configured_password() {
        let mut catalog = ProjectCatalog::new(Some("sesame".to_string()));
        let conn = Uuid::new_v4();

        assert_eq!(
            catalog.request_root(conn, "wrong"),
            RootMessageDto::RootRequestDenied
        );
        assert!(!catalog.selection_for(conn).is_root);

        assert_eq!(
            catalog.request_root(conn, "sesame"),
            RootMessageDto::RootRequestAccepted
        );
        assert!(catalog.selection_for(conn).is_root);
    }

    #[test]
    fn root_is_always_denied_without_a_password() {
        let mut catalog = ProjectCatalog::new(None);
        let conn = Uuid::new_v4();
        assert_eq!(
            catalog.request_root(conn, ""),
            RootMessageDto::RootRequestDenied
        );
    }

    #[test]
    fn unroot_without_root_is_permission_denied() {
        let mut catalog = ProjectCatalog::new(Some("sesame".to_string()));
        let conn = Uuid::new_v4();

        assert_eq!(
            catalog.request_unroot(conn),
            RootMessageDto::PermissionDenied
        );

        catalog.request_root(conn, "sesame");
        assert_eq!(catalog.request_unroot(conn), RootMessageDto::Unrooted);
        assert!(!catalog.selection_for(conn).is_root);
    }

    #[test]
    fn locking_requires_root_and_a_known_project() {
        let mut catalog = ProjectCatalog::new(Some("sesame".to_string()));
        let conn = Uuid::new_v4();

        assert_eq!(
            catalog.set_project_open(conn, 1, false),
            RootMessageDto::PermissionDenied
        );

        catalog.request_root(conn, "sesame");
        assert_eq!(
            catalog.set_project_open(conn, 1, false),
            RootMessageDto::ProjectLocked
        );
        assert!(!catalog.selection_for(conn).previews[0].is_open);

        assert_eq!(
            catalog.set_project_open(conn, 1, true),
            RootMessageDto::ProjectUnlocked
        );
        assert_eq!(
            catalog.set_project_open(conn, 99, false),
            RootMessageDto::PermissionDenied
        );
    }

    #[test]
    fn forget_clears_root_status() {
        let mut catalog = ProjectCatalog::new(Some("sesame".to_string()));
        let conn = Uuid::new_v4();
        catalog.request_root(conn, "sesame");

        catalog.forget(conn);
        assert!(!catalog.selection_for(conn).is_root);
    }
}
