//! Per-data-service variance.
//!
//! Everything that differs between data services lives here, except the
//! expected-metrics table (see [`crate::metrics::expected`]):
//!
//! | Data service | CR kind | Container | External access |
//! |--------------|---------|-----------|-----------------|
//! | Cassandra | Cassandra | cassandra | no |
//! | Consul | Consul | consul | no |
//! | Couchbase | Couchbase | couchbase | yes |
//! | Elasticsearch | Elasticsearch | elasticsearch | no |
//! | Kafka | Kafka | kafka | yes |
//! | MongoDB Enterprise | MongoDB | mongos | no |
//! | MySQL | MySQL | mysql | no |
//! | PostgreSQL | Postgresql | postgresql | no |
//! | RabbitMQ | RabbitMQ | rabbitmq | yes |
//! | Redis | Redis | redis | no |
//! | SQL Server | SqlServer | sql-server | no |
//! | ZooKeeper | ZooKeeper | zookeeper | no |

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// API group of data-service custom resources on the target cluster.
pub const DEPLOYMENTS_GROUP: &str = "deployments.pds.io";

/// API version of data-service custom resources.
pub const DEPLOYMENTS_VERSION: &str = "v1";

/// Repository of the load-test images.
pub const LOAD_TEST_REPOSITORY: &str = "portworx/pds-loadtests";

/// Data services supported by the Control Plane.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DataService {
    Cassandra,
    Consul,
    Couchbase,
    Elasticsearch,
    Kafka,
    MongoDB,
    MySQL,
    Postgres,
    RabbitMQ,
    Redis,
    SqlServer,
    ZooKeeper,
}

impl DataService {
    pub const ALL: [DataService; 12] = [
        DataService::Cassandra,
        DataService::Consul,
        DataService::Couchbase,
        DataService::Elasticsearch,
        DataService::Kafka,
        DataService::MongoDB,
        DataService::MySQL,
        DataService::Postgres,
        DataService::RabbitMQ,
        DataService::Redis,
        DataService::SqlServer,
        DataService::ZooKeeper,
    ];

    /// Name used by the Control Plane catalog.
    pub fn name(self) -> &'static str {
        match self {
            DataService::Cassandra => "Cassandra",
            DataService::Consul => "Consul",
            DataService::Couchbase => "Couchbase",
            DataService::Elasticsearch => "Elasticsearch",
            DataService::Kafka => "Kafka",
            DataService::MongoDB => "MongoDB Enterprise",
            DataService::MySQL => "MySQL",
            DataService::Postgres => "PostgreSQL",
            DataService::RabbitMQ => "RabbitMQ",
            DataService::Redis => "Redis",
            DataService::SqlServer => "SQL Server",
            DataService::ZooKeeper => "ZooKeeper",
        }
    }

    /// Look up a data service by catalog name, ignoring case.
    ///
    /// Also accepts the CR kind, so either plane's naming resolves.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL.into_iter().find(|ds| {
            ds.name().eq_ignore_ascii_case(name) || ds.kind().eq_ignore_ascii_case(name)
        })
    }

    /// Kind of the data-service custom resource.
    pub fn kind(self) -> &'static str {
        match self {
            DataService::Cassandra => "Cassandra",
            DataService::Consul => "Consul",
            DataService::Couchbase => "Couchbase",
            DataService::Elasticsearch => "Elasticsearch",
            DataService::Kafka => "Kafka",
            DataService::MongoDB => "MongoDB",
            DataService::MySQL => "MySQL",
            DataService::Postgres => "Postgresql",
            DataService::RabbitMQ => "RabbitMQ",
            DataService::Redis => "Redis",
            DataService::SqlServer => "SqlServer",
            DataService::ZooKeeper => "ZooKeeper",
        }
    }

    /// Plural resource name of the data-service custom resource.
    pub fn plural(self) -> &'static str {
        match self {
            DataService::Cassandra => "cassandras",
            DataService::Consul => "consuls",
            DataService::Couchbase => "couchbases",
            DataService::Elasticsearch => "elasticsearches",
            DataService::Kafka => "kafkas",
            DataService::MongoDB => "mongodbs",
            DataService::MySQL => "mysqls",
            DataService::Postgres => "postgresqls",
            DataService::RabbitMQ => "rabbitmqs",
            DataService::Redis => "redis",
            DataService::SqlServer => "sqlservers",
            DataService::ZooKeeper => "zookeepers",
        }
    }

    /// Name of the main container in the data service's StatefulSet.
    pub fn container_name(self) -> &'static str {
        match self {
            DataService::Cassandra => "cassandra",
            DataService::Consul => "consul",
            DataService::Couchbase => "couchbase",
            DataService::Elasticsearch => "elasticsearch",
            DataService::Kafka => "kafka",
            DataService::MongoDB => "mongos",
            DataService::MySQL => "mysql",
            DataService::Postgres => "postgresql",
            DataService::RabbitMQ => "rabbitmq",
            DataService::Redis => "redis",
            DataService::SqlServer => "sql-server",
            DataService::ZooKeeper => "zookeeper",
        }
    }

    /// Workload image used by the load-test job runner.
    pub fn load_test_image(self) -> String {
        let tag = match self {
            DataService::Cassandra => "cassandra-0.0.5",
            DataService::Consul => "consul-0.0.1",
            DataService::Couchbase => "couchbase-0.0.3",
            DataService::Elasticsearch => "elasticsearch-0.0.2",
            DataService::Kafka => "kafka-0.0.3",
            DataService::MongoDB => "mongodb-0.0.1",
            DataService::MySQL => "mysql-0.0.3",
            DataService::Postgres => "postgresql-0.0.3",
            DataService::RabbitMQ => "rabbitmq-0.0.2",
            DataService::Redis => "redis-0.0.3",
            DataService::SqlServer => "sqlserver-0.0.1",
            DataService::ZooKeeper => "zookeeper-0.0.2",
        };
        format!("{LOAD_TEST_REPOSITORY}:{tag}")
    }

    /// Whether clients reach the data service through externally resolvable
    /// hostnames, which the harness then has to verify.
    pub fn requires_external_access(self) -> bool {
        matches!(
            self,
            DataService::Kafka | DataService::RabbitMQ | DataService::Couchbase
        )
    }
}

impl fmt::Display for DataService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataService {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| Error::UnknownDataService(s.to_string()))
    }
}
