//! Metrics every data service is expected to export.

use super::promql::Selector;
use crate::dataservice::DataService;

/// Selectors that must return at least one sample for a healthy deployment.
pub fn expected_metrics(data_service: DataService) -> Vec<Selector> {
    match data_service {
        DataService::Cassandra => vec![
            Selector::new("cassandra_clientrequest_latency_seconds_sum").eq("clientrequest", "Read"),
            Selector::new("cassandra_clientrequest_latency_seconds_count")
                .re("clientrequest", ".*Write.*"),
            Selector::new("cassandra_storage_load_bytes"),
        ],
        DataService::Consul => vec![
            Selector::new("consul_raft_leader"),
            Selector::new("consul_runtime_alloc_bytes"),
        ],
        DataService::Couchbase => vec![
            Selector::new("cbnode_healthy"),
            Selector::new("cbbucketinfo_basic_dataused_bytes"),
        ],
        DataService::Elasticsearch => vec![
            Selector::new("elasticsearch_cluster_health_status").eq("color", "green"),
            Selector::new("elasticsearch_indices_docs"),
        ],
        DataService::Kafka => vec![
            Selector::new("kafka_server_brokertopicmetrics_messagesin_total"),
            Selector::new("kafka_controller_kafkacontroller_activecontrollercount"),
        ],
        DataService::MongoDB => vec![
            Selector::new("mongodb_up"),
            Selector::new("mongodb_connections").eq("state", "current"),
        ],
        DataService::MySQL => vec![
            Selector::new("mysql_up"),
            Selector::new("mysql_global_status_threads_connected"),
        ],
        DataService::Postgres => vec![
            Selector::new("pg_up"),
            Selector::new("pg_stat_database_xact_commit").not_re("datname", "template.*"),
            Selector::new("pg_database_size_bytes"),
        ],
        DataService::RabbitMQ => vec![
            Selector::new("rabbitmq_identity_info"),
            Selector::new("rabbitmq_connections"),
        ],
        DataService::Redis => vec![
            Selector::new("redis_up"),
            Selector::new("redis_connected_clients"),
            Selector::new("redis_commands_processed_total"),
        ],
        DataService::SqlServer => vec![
            Selector::new("mssql_up"),
            Selector::new("mssql_connections").ne("database", ""),
        ],
        DataService::ZooKeeper => vec![
            Selector::new("znode_count"),
            Selector::new("num_alive_connections"),
        ],
    }
}
