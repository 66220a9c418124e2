//! ExternalDNS `DNSEndpoint` resource.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Records ExternalDNS publishes for a data service.
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "externaldns.k8s.io",
    version = "v1alpha1",
    kind = "DNSEndpoint",
    plural = "dnsendpoints",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct DNSEndpointSpec {
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub dns_name: String,
    #[serde(default)]
    pub record_type: String,
    #[serde(default)]
    pub targets: Vec<String>,
}

impl DNSEndpoint {
    /// Host names of the CNAME records.
    pub fn cname_hosts(&self) -> impl Iterator<Item = &str> {
        self.spec
            .endpoints
            .iter()
            .filter(|e| e.record_type.eq_ignore_ascii_case("CNAME"))
            .map(|e| e.dns_name.as_str())
    }
}
