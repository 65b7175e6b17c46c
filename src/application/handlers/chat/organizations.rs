//! Organization and project queries.

use std::sync::Arc;
use tracing::{info, instrument};

use crate::application::ChatError;
use crate::domain::chat::{Organization, Project};
use crate::domain::foundation::ValidationError;
use crate::ports::{NewProject, SessionContext};

/// Query for the caller's organizations.
#[derive(Debug, Clone)]
pub struct ListOrganizationsQuery {
    pub session: Arc<SessionContext>,
}

#[derive(Debug, Clone, Default)]
pub struct ListOrganizationsHandler;

impl ListOrganizationsHandler {
    pub fn new() -> Self {
        Self
    }

    #[instrument(skip_all)]
    pub async fn handle(&self, query: ListOrganizationsQuery) -> Result<Vec<Organization>, ChatError> {
        let provider = query.session.provider()?;
        Ok(provider.list_organizations().await?)
    }
}

/// Query for the projects of one organization.
#[derive(Debug, Clone)]
pub struct ListProjectsQuery {
    pub session: Arc<SessionContext>,
    pub org_id: String,
    pub include_archived: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ListProjectsHandler;

impl ListProjectsHandler {
    pub fn new() -> Self {
        Self
    }

    #[instrument(skip_all, fields(org = %query.org_id, include_archived = query.include_archived))]
    pub async fn handle(&self, query: ListProjectsQuery) -> Result<Vec<Project>, ChatError> {
        if query.org_id.trim().is_empty() {
            return Err(ValidationError::empty_field("org_id").into());
        }
        let provider = query.session.provider()?;
        Ok(provider
            .list_projects(&query.org_id, query.include_archived)
            .await?)
    }
}

/// Command to create a project in one organization.
#[derive(Debug, Clone)]
pub struct CreateProjectCommand {
    pub session: Arc<SessionContext>,
    pub org_id: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Default)]
pub struct CreateProjectHandler;

impl CreateProjectHandler {
    pub fn new() -> Self {
        Self
    }

    #[instrument(skip_all, fields(org = %cmd.org_id))]
    pub async fn handle(&self, cmd: CreateProjectCommand) -> Result<Project, ChatError> {
        if cmd.org_id.trim().is_empty() {
            return Err(ValidationError::empty_field("org_id").into());
        }
        if cmd.name.trim().is_empty() {
            return Err(ValidationError::empty_field("name").into());
        }
        let provider = cmd.session.provider()?;
        let project = provider
            .create_project(
                &cmd.org_id,
                NewProject {
                    name: cmd.name,
                    description: cmd.description,
                },
            )
            .await?;
        info!(project = %project.id, "project created");
        Ok(project)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::upstream::{MockCall, MockUpstream};
    use crate::application::handlers::testing::{expired_session_for, session_for};
    use crate::domain::session::SessionError;

    #[tokio::test]
    async fn lists_organizations() {
        let upstream = MockUpstream::new().with_organizations(vec![
            Organization::new("o1", "Personal"),
            Organization::new("o2", "Work"),
        ]);

        let orgs = ListOrganizationsHandler::new()
            .handle(ListOrganizationsQuery {
                session: session_for(&upstream),
            })
            .await
            .unwrap();

        assert_eq!(orgs.len(), 2);
        assert_eq!(orgs[1].name, "Work");
    }

    #[tokio::test]
    async fn expired_session_fails_fast() {
        let upstream = MockUpstream::new();

        let err = ListOrganizationsHandler::new()
            .handle(ListOrganizationsQuery {
                session: expired_session_for(&upstream),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ChatError::Session(SessionError::Expired(_))));
        assert_eq!(upstream.call_count(), 0);
    }

    #[tokio::test]
    async fn forwards_include_archived() {
        let upstream = MockUpstream::new().with_projects(vec![
            Project::new("p1", "Live"),
            Project::new("p2", "Old").archived("2024-01-01T00:00:00Z"),
        ]);
        let handler = ListProjectsHandler::new();

        let visible = handler
            .handle(ListProjectsQuery {
                session: session_for(&upstream),
                org_id: "org-1".to_string(),
                include_archived: false,
            })
            .await
            .unwrap();
        let all = handler
            .handle(ListProjectsQuery {
                session: session_for(&upstream),
                org_id: "org-1".to_string(),
                include_archived: true,
            })
            .await
            .unwrap();

        assert_eq!(visible, vec![Project::new("p1", "Live")]);
        assert_eq!(all.len(), 2);
        assert_eq!(
            upstream.calls()[1],
            MockCall::ListProjects {
                org_id: "org-1".to_string(),
                include_archived: true
            }
        );
    }

    fn create_project(upstream: &MockUpstream, name: &str) -> CreateProjectCommand {
        CreateProjectCommand {
            session: session_for(upstream),
            org_id: "org-1".to_string(),
            name: name.to_string(),
            description: String::new(),
        }
    }

    #[tokio::test]
    async fn creates_project_with_empty_description_by_default() {
        let upstream = MockUpstream::new();

        let project = CreateProjectHandler::new()
            .handle(create_project(&upstream, "Research"))
            .await
            .unwrap();

        assert_eq!(project.name, "Research");
        assert_eq!(
            upstream.calls(),
            vec![MockCall::CreateProject {
                org_id: "org-1".to_string(),
                name: "Research".to_string(),
                description: String::new(),
            }]
        );
    }

    #[tokio::test]
    async fn blank_project_name_never_reaches_upstream() {
        let upstream = MockUpstream::new();

        let err = CreateProjectHandler::new()
            .handle(create_project(&upstream, "  "))
            .await
            .unwrap_err();

        assert!(matches!(err, ChatError::Validation(_)));
        assert_eq!(upstream.call_count(), 0);
    }
}
