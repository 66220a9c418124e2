//! Load balancer and external DNS checks.

use std::collections::BTreeMap;
use std::time::Duration;

use k8s_openapi::api::batch::v1::{Job, JobSpec};
use k8s_openapi::api::core::v1::{Container, EnvVar, PodSpec, PodTemplateSpec, Service};
use kube::api::ObjectMeta;
use tracing::{debug, info};

use super::{CrossCluster, DeploymentLocation};
use crate::cluster::ENVIRONMENT_LABEL;
use crate::cluster::jobs::{JobOutcome, run_job};
use crate::names::random_name;
use crate::sink::{Sink, SinkExt};
use crate::timing::{DEFAULT_POLL_PERIOD, QUICK_POLL_PERIOD, SHORT_TIMEOUT, STANDARD_TIMEOUT};
use crate::wait::eventually;

/// Image of the one-shot resolver job.
pub const DNS_CHECK_IMAGE: &str = "portworx/dnsutils";

/// Resolves every host on every server, retrying the whole set every
/// `RETRY_SECONDS` until it passes or `TIMEOUT_SECONDS` elapse.
const DNS_CHECK_SCRIPT: &str = r#"
check() {
  for host in $HOSTS; do
    if [ -z "$SERVERS" ]; then
      answer=$(dig +short "$host")
      if [ -z "$answer" ]; then echo "no answer for $host"; return 1; fi
      echo "$host: $answer"
    fi
    for server in $SERVERS; do
      answer=$(dig +short "@$server" "$host")
      if [ -z "$answer" ]; then echo "no answer for $host from $server"; return 1; fi
      echo "$host @$server: $answer"
    done
  done
}
deadline=$(( $(date +%s) + TIMEOUT_SECONDS ))
until check; do
  if [ "$(date +%s)" -ge "$deadline" ]; then echo "giving up"; exit 1; fi
  sleep "$RETRY_SECONDS"
done
"#;

/// Time the resolver job keeps retrying.
const DNS_CHECK_TIMEOUT: Duration = STANDARD_TIMEOUT;

/// Every LoadBalancer service has at least one ingress entry.
pub fn load_balancer_services_ready(services: &[Service]) -> bool {
    services
        .iter()
        .filter(|svc| {
            svc.spec.as_ref().and_then(|s| s.type_.as_deref()) == Some("LoadBalancer")
        })
        .all(|svc| {
            svc.status
                .as_ref()
                .and_then(|s| s.load_balancer.as_ref())
                .and_then(|lb| lb.ingress.as_ref())
                .is_some_and(|ingress| !ingress.is_empty())
        })
}

/// Job resolving every host against every DNS server, retrying inside the pod
/// for up to `timeout`. An empty `servers` list uses the pod's resolver.
pub fn dns_check_job(
    name: &str,
    environment: &str,
    hosts: &[String],
    servers: &[String],
    timeout: Duration,
) -> Job {
    let env = |name: &str, value: String| EnvVar {
        name: name.to_string(),
        value: Some(value),
        ..Default::default()
    };
    Job {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            labels: Some(BTreeMap::from([(
                ENVIRONMENT_LABEL.to_string(),
                environment.to_string(),
            )])),
            ..Default::default()
        },
        spec: Some(JobSpec {
            completions: Some(1),
            backoff_limit: Some(0),
            active_deadline_seconds: Some(
                i64::try_from(timeout.saturating_add(SHORT_TIMEOUT).as_secs()).unwrap_or(i64::MAX),
            ),
            template: PodTemplateSpec {
                spec: Some(PodSpec {
                    restart_policy: Some("Never".to_string()),
                    containers: vec![Container {
                        name: "dnsutils".to_string(),
                        image: Some(DNS_CHECK_IMAGE.to_string()),
                        command: Some(vec![
                            "/bin/sh".to_string(),
                            "-c".to_string(),
                            DNS_CHECK_SCRIPT.to_string(),
                        ]),
                        env: Some(vec![
                            env("HOSTS", hosts.join(" ")),
                            env("SERVERS", servers.join(" ")),
                            env("TIMEOUT_SECONDS", timeout.as_secs().to_string()),
                            env("RETRY_SECONDS", DEFAULT_POLL_PERIOD.as_secs().to_string()),
                        ]),
                        ..Default::default()
                    }],
                    ..Default::default()
                }),
                ..Default::default()
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

impl CrossCluster {
    pub async fn wait_for_load_balancer_services_ready(&self, t: &dyn Sink, deployment_id: &str) {
        let location = self.must_locate(t, deployment_id).await;
        let selector = location.name_selector();
        eventually(t, STANDARD_TIMEOUT, DEFAULT_POLL_PERIOD, async |t: &dyn Sink| {
            let services = t.require_ok(
                self.cluster.list_services(&location.namespace, &selector).await,
                "list services",
            );
            t.require_true(!services.is_empty(), &format!("services labelled {selector}"));
            t.require_true(
                load_balancer_services_ready(&services),
                "every LoadBalancer service has an ingress",
            );
        })
        .await;
    }

    /// For data services reached through external host names, check that
    /// every published host resolves on every DNS server.
    pub async fn wait_for_hosts_accessible_if_needed(&self, t: &dyn Sink, deployment_id: &str) {
        let location = self.must_locate(t, deployment_id).await;
        if !location.data_service.requires_external_access() {
            debug!(data_service = %location.data_service, "No external hosts to check");
            return;
        }

        let hosts = self.must_collect_hosts(t, &location).await;
        let servers = self.must_flush_dns_cache(t).await;
        info!(?hosts, ?servers, "Checking external host resolution");

        self.run_dns_check(t, &location.namespace, &hosts, &servers).await;
    }

    async fn must_collect_hosts(&self, t: &dyn Sink, location: &DeploymentLocation) -> Vec<String> {
        let selector = location.name_selector();
        let mut hosts = Vec::new();
        eventually(t, STANDARD_TIMEOUT, DEFAULT_POLL_PERIOD, async |t: &dyn Sink| {
            let endpoints = t.require_ok(
                self.cluster
                    .list_dns_endpoints(&location.namespace, &selector)
                    .await,
                "list DNS endpoints",
            );
            hosts = endpoints
                .iter()
                .flat_map(|e| e.cname_hosts().map(str::to_string))
                .collect();
            t.require_true(!hosts.is_empty(), "CNAME endpoints published");
        })
        .await;
        hosts
    }

    /// Restart the authoritative DNS server so it drops cached answers, and
    /// return its pod IPs. Without DNS configuration nothing is flushed and
    /// the list is empty.
    pub async fn must_flush_dns_cache(&self, t: &dyn Sink) -> Vec<String> {
        let Some(dns) = self.dns.as_ref() else {
            t.log("no DNS server configured; using the cluster resolver");
            return Vec::new();
        };
        t.require_ok(
            self.cluster
                .restart_deployment(&dns.namespace, &dns.deployment)
                .await,
            "restart DNS server",
        );

        let mut servers = Vec::new();
        eventually(t, SHORT_TIMEOUT, QUICK_POLL_PERIOD, async |t: &dyn Sink| {
            let deployment = t.require_ok(
                self.cluster.get_deployment(&dns.namespace, &dns.deployment).await,
                "get DNS deployment",
            );
            t.require_true(rollout_complete(&deployment), "DNS rollout complete");

            let pods = t.require_ok(
                self.cluster.list_pods(&dns.namespace, &dns.pod_selector).await,
                "list DNS pods",
            );
            servers = pods
                .iter()
                .filter(|p| p.metadata.deletion_timestamp.is_none())
                .filter_map(|p| p.status.as_ref()?.pod_ip.clone())
                .collect();
            t.require_true(!servers.is_empty(), "DNS pods have IPs");
        })
        .await;
        servers
    }

    /// Run one resolver job and fail the test unless it succeeds. The job
    /// retries by itself, so only its status is polled here.
    async fn run_dns_check(&self, t: &dyn Sink, namespace: &str, hosts: &[String], servers: &[String]) {
        let job = dns_check_job(
            &random_name("dns-check"),
            &self.environment,
            hosts,
            servers,
            DNS_CHECK_TIMEOUT,
        );
        let run = run_job(
            t,
            &self.cluster,
            namespace,
            &job,
            DNS_CHECK_TIMEOUT.saturating_add(SHORT_TIMEOUT),
            None,
        )
        .await;
        t.require_true(
            run.outcome == Some(JobOutcome::Succeeded),
            &format!("hosts resolve on every DNS server ({}):\n{}", run.name, run.logs),
        );
    }
}

fn rollout_complete(deployment: &k8s_openapi::api::apps::v1::Deployment) -> bool {
    let desired = deployment.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1);
    let generation = deployment.metadata.generation.unwrap_or(0);
    let Some(status) = deployment.status.as_ref() else {
        return false;
    };
    status.observed_generation.unwrap_or(0) >= generation
        && status.updated_replicas.unwrap_or(0) == desired
        && status.ready_replicas.unwrap_or(0) == desired
        && status.replicas.unwrap_or(0) == desired
}
