//! Data service catalog.

use super::models::{CatalogDataService, Image};
use super::{ApiError, ControlPlane};

impl ControlPlane {
    pub async fn list_data_services(&self) -> Result<Vec<CatalogDataService>, ApiError> {
        self.list("/data-services", &[]).await
    }

    pub async fn get_data_service(&self, id: &str) -> Result<CatalogDataService, ApiError> {
        self.get(&format!("/data-services/{id}")).await
    }

    /// Images of a data service, optionally restricted to the latest
    /// compatible build of each version.
    pub async fn list_images(
        &self,
        data_service_id: &str,
        latest_compatible_only: bool,
    ) -> Result<Vec<Image>, ApiError> {
        let mut query = vec![("data_service_id", data_service_id)];
        if latest_compatible_only {
            query.push(("latest_compatible_only", "true"));
        }
        let images: Vec<Image> = self.list("/images", &query).await?;
        Ok(images
            .into_iter()
            .filter(|image| image.data_service_id == data_service_id)
            .collect())
    }

    pub async fn get_image(&self, id: &str) -> Result<Image, ApiError> {
        self.get(&format!("/images/{id}")).await
    }
}
