//! Volume cleanup after a deployment is gone.

use kube::ResourceExt;
use tracing::{info, warn};

use super::CrossCluster;
use crate::cluster::{DEPLOYMENT_ID_LABEL, ignore_not_found, label_selector};
use crate::sink::Sink;

impl CrossCluster {
    /// Delete the volumes of a deployment, claim first. Best effort: errors
    /// are logged and the remaining volumes are still processed.
    pub async fn delete_deployment_volumes(&self, t: &dyn Sink, deployment_id: &str) {
        for problem in self.remove_deployment_volumes(deployment_id).await {
            t.log(&problem);
        }
    }

    /// [`delete_deployment_volumes`](Self::delete_deployment_volumes) for
    /// cleanups, which have no sink. Returns the problems encountered.
    pub async fn remove_deployment_volumes(&self, deployment_id: &str) -> Vec<String> {
        let selector = label_selector(DEPLOYMENT_ID_LABEL, deployment_id);
        let volumes = match self.cluster.list_persistent_volumes(&selector).await {
            Ok(volumes) => volumes,
            Err(e) => return vec![format!("listing volumes of deployment {deployment_id}: {e}")],
        };

        let mut problems = Vec::new();
        for pv in volumes {
            let pv_name = pv.name_any();
            let claim = pv
                .spec
                .as_ref()
                .and_then(|spec| spec.claim_ref.as_ref())
                .and_then(|claim| Some((claim.namespace.clone()?, claim.name.clone()?)));
            if let Some((namespace, name)) = claim
                && let Err(e) = ignore_not_found(
                    self.cluster
                        .delete_persistent_volume_claim(&namespace, &name)
                        .await,
                )
            {
                problems.push(format!("deleting claim {namespace}/{name}: {e}"));
            }
            match ignore_not_found(self.cluster.delete_persistent_volume(&pv_name).await) {
                Ok(_) => info!(volume = %pv_name, deployment_id, "Deleted volume"),
                Err(e) => problems.push(format!("deleting volume {pv_name}: {e}")),
            }
        }
        for problem in &problems {
            warn!(deployment_id, "{}", problem);
        }
        problems
    }
}
