use super::attributes::DailyAssetPolicy;
use super::datatrails::DataTrailsEngine;
use super::datatrails_events::DataTrailsEventsEngine;
use super::null::NullEngine;
use super::traits::TransparencyEngine;
use crate::config::EngineArgs;
use crate::error::ConfigError;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;
use strum::{Display, EnumIter};

pub type EngineBuild = Pin<Box<dyn Future<Output = Arc<dyn TransparencyEngine>> + Send>>;

/// Constructor registered for an engine kind.
pub type EngineConstructor = fn(EngineArgs) -> EngineBuild;

/// Known transparency service backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum EngineKind {
    #[strum(to_string = "dummy")]
    Dummy,
    #[strum(to_string = "DataTrails")]
    DataTrails,
    #[strum(to_string = "DataTrailsEvents")]
    DataTrailsEvents,
}

impl FromStr for EngineKind {
    type Err = ConfigError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "dummy" | "null" => Ok(Self::Dummy),
            "datatrails" => Ok(Self::DataTrails),
            "datatrailsevents" | "datatrails-events" | "datatrailsdroid" | "datatrails-droid" => {
                Ok(Self::DataTrailsEvents)
            }
            _ => Err(ConfigError::UnknownEngine(tag.to_string())),
        }
    }
}

impl EngineKind {
    pub fn requires_credentials(self) -> bool {
        !matches!(self, Self::Dummy)
    }

    pub fn constructor(self) -> EngineConstructor {
        match self {
            Self::Dummy => build_null,
            Self::DataTrails => build_datatrails,
            Self::DataTrailsEvents => build_datatrails_events,
        }
    }
}

fn build_null(_args: EngineArgs) -> EngineBuild {
    Box::pin(async { Arc::new(NullEngine::new()) as Arc<dyn TransparencyEngine> })
}

fn build_datatrails(args: EngineArgs) -> EngineBuild {
    Box::pin(async move {
        Arc::new(DataTrailsEngine::connect(&args).await) as Arc<dyn TransparencyEngine>
    })
}

fn build_datatrails_events(args: EngineArgs) -> EngineBuild {
    Box::pin(async move {
        let policy = Arc::new(DailyAssetPolicy::today());
        Arc::new(DataTrailsEventsEngine::connect(&args, policy).await) as Arc<dyn TransparencyEngine>
    })
}

/// Resolve a backend tag and construct its engine.
///
/// Unknown tags and missing credentials are configuration errors. Network
/// failures during setup are not: the engine is returned uninitialized and
/// the façade's health gate reports it.
pub async fn create_engine(
    tag: &str,
    args: &EngineArgs,
) -> Result<Arc<dyn TransparencyEngine>, ConfigError> {
    let kind: EngineKind = tag.parse()?;
    if kind.requires_credentials() {
        args.validate()?;
    }
    tracing::debug!(engine = %kind, url = %args.url, "creating transparency engine");
    Ok((kind.constructor())(args.clone()).await)
}
