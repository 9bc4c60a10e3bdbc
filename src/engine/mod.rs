pub mod attributes;
pub mod auth;
pub mod datatrails;
pub mod datatrails_events;
pub mod factory;
pub mod http_client;
pub mod normalize;
pub mod null;
pub mod scrub;
pub mod traits;

pub use attributes::{AssetSpec, AttributePolicy, DailyAssetPolicy};
pub use datatrails::DataTrailsEngine;
pub use datatrails_events::DataTrailsEventsEngine;
pub use factory::{EngineConstructor, EngineKind, create_engine};
pub use null::NullEngine;
pub use traits::{EngineFuture, EngineResult, TransparencyConfiguration, TransparencyEngine};
