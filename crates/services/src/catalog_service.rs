use std::sync::Arc;

use storage::repository::{CatalogRepository, StorageError};
use study_core::model::{Catalog, CurrentUser, NewTopic, Section, Topic, TopicId};

use crate::error::CatalogServiceError;

/// Reads the curriculum and lets admins extend it.
#[derive(Clone)]
pub struct CatalogService {
    catalog: Arc<dyn CatalogRepository>,
}

impl CatalogService {
    #[must_use]
    pub fn new(catalog: Arc<dyn CatalogRepository>) -> Self {
        Self { catalog }
    }

    /// Sections in display order.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` if the catalog cannot be read.
    pub async fn list_sections(&self) -> Result<Vec<Section>, CatalogServiceError> {
        Ok(self.catalog.list_sections().await?)
    }

    /// All topics in display order.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` if the catalog cannot be read.
    pub async fn list_topics(&self) -> Result<Vec<Topic>, CatalogServiceError> {
        Ok(self.catalog.list_topics().await?)
    }

    /// Sections and topics together.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` if the catalog cannot be read.
    pub async fn load_catalog(&self) -> Result<Catalog, CatalogServiceError> {
        let sections = self.catalog.list_sections().await?;
        let topics = self.catalog.list_topics().await?;
        tracing::debug!(sections = sections.len(), topics = topics.len(), "catalog loaded");
        Ok(Catalog::new(sections, topics))
    }

    /// Append a topic from raw form input.
    ///
    /// Checks run in order: admin role, then input shape, then the store.
    /// Nothing is written unless all of them pass.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::PermissionDenied` for non-admins.
    /// Returns `CatalogServiceError::Topic` for a malformed section id or text.
    /// Returns `CatalogServiceError::SectionNotFound` if the section is absent.
    /// Returns `CatalogServiceError::Storage` if the write fails.
    pub async fn append_topic(
        &self,
        user: &CurrentUser,
        section_id: &str,
        text: &str,
    ) -> Result<Topic, CatalogServiceError> {
        ensure_admin(user)?;
        let draft = NewTopic::parse(section_id, text)?;
        self.append(user, &draft).await
    }

    /// Append an already-validated topic.
    ///
    /// # Errors
    ///
    /// Same as `append_topic`, minus input validation.
    pub async fn append(
        &self,
        user: &CurrentUser,
        draft: &NewTopic,
    ) -> Result<Topic, CatalogServiceError> {
        ensure_admin(user)?;
        let topic = self
            .catalog
            .append_topic(TopicId::random(), draft)
            .await
            .map_err(|err| match err {
                StorageError::NotFound => {
                    CatalogServiceError::SectionNotFound(draft.section_id().to_string())
                }
                other => CatalogServiceError::Storage(other),
            })?;
        tracing::info!(
            user_id = %user.id,
            section_id = %topic.section_id(),
            topic_id = %topic.id(),
            order = topic.order(),
            "topic appended"
        );
        Ok(topic)
    }
}

fn ensure_admin(user: &CurrentUser) -> Result<(), CatalogServiceError> {
    if user.is_admin {
        Ok(())
    } else {
        tracing::warn!(user_id = %user.id, "non-admin tried to add a topic");
        Err(CatalogServiceError::PermissionDenied)
    }
}

#[cfg(test)]
mod tests {
    use storage::repository::InMemoryRepository;
    use study_core::ErrorKind;
    use study_core::model::{SectionId, UserId};

    use super::*;

    async fn service_with_section() -> (CatalogService, InMemoryRepository, Section) {
        let repo = InMemoryRepository::new();
        let section = Section::new(SectionId::random(), "After CT2", "📙", 1).unwrap();
        repo.upsert_section(&section).await.unwrap();
        (CatalogService::new(Arc::new(repo.clone())), repo, section)
    }

    #[tokio::test]
    async fn admin_appends_at_the_end() {
        let (service, _, section) = service_with_section().await;
        let admin = CurrentUser::admin(UserId::random());
        let sid = section.id().to_string();

        let first = service.append_topic(&admin, &sid, "Files").await.unwrap();
        let second = service.append_topic(&admin, &sid, "  Sets  ").await.unwrap();
        assert_eq!(first.order(), 1);
        assert_eq!(second.order(), 2);
        assert_eq!(second.text().as_str(), "Sets");

        let catalog = service.load_catalog().await.unwrap();
        assert_eq!(catalog.topics_in(section.id()).count(), 2);
    }

    #[tokio::test]
    async fn member_is_refused_before_validation() {
        let (service, repo, _) = service_with_section().await;
        let member = CurrentUser::member(UserId::random());
        let err = service.append_topic(&member, "not-a-uuid", "").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Permission);
        assert!(repo.list_topics().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_input_is_validation() {
        let (service, repo, section) = service_with_section().await;
        let admin = CurrentUser::admin(UserId::random());

        let blank = service
            .append_topic(&admin, &section.id().to_string(), "   ")
            .await
            .unwrap_err();
        assert_eq!(blank.kind(), ErrorKind::Validation);

        let long = "x".repeat(501);
        let too_long = service
            .append_topic(&admin, &section.id().to_string(), &long)
            .await
            .unwrap_err();
        assert_eq!(too_long.kind(), ErrorKind::Validation);

        let bad_id = service.append_topic(&admin, "nope", "Files").await.unwrap_err();
        assert_eq!(bad_id.kind(), ErrorKind::Validation);
        assert!(repo.list_topics().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_section_is_not_found() {
        let (service, _, _) = service_with_section().await;
        let admin = CurrentUser::admin(UserId::random());
        let ghost = SectionId::random().to_string();
        let err = service.append_topic(&admin, &ghost, "Files").await.unwrap_err();
        assert!(matches!(err, CatalogServiceError::SectionNotFound(ref id) if *id == ghost));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn concurrent_appends_get_distinct_orders() {
        let (service, _, section) = service_with_section().await;
        let admin = CurrentUser::admin(UserId::random());
        let sid = section.id().to_string();

        let mut tasks = Vec::new();
        for i in 0..16 {
            let service = service.clone();
            let sid = sid.clone();
            tasks.push(tokio::spawn(async move {
                service.append_topic(&admin, &sid, &format!("topic {i}")).await
            }));
        }
        let mut orders = Vec::new();
        for task in tasks {
            orders.push(task.await.unwrap().unwrap().order());
        }
        orders.sort_unstable();
        assert_eq!(orders, (1..=16).collect::<Vec<i64>>());
    }
}
