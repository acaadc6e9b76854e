use thiserror::Error;

pub type ProvisionResult<T> = Result<T, ProvisionError>;

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("no command configured for {0}")]
    NoCommand(&'static str),

    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} did not finish within {secs}s")]
    Timeout { program: String, secs: u64 },

    #[error("failed waiting for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{what} failed with {}", exit_label(.code))]
    Exit { what: String, code: Option<i32> },

    #[error("provisioning output did not include a JSON payload")]
    MissingPayload,

    #[error("provisioning payload is malformed: {0}")]
    Payload(String),

    #[error("provisioning returned no instances")]
    NoInstances,

    #[error("snapshot response missing id for {0}")]
    SnapshotId(String),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {code}"),
        None => "a signal".to_string(),
    }
}
