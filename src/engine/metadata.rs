// ABOUTME: Static engine identity advertised to the host
// ABOUTME: Names the engine handle and the template file extensions it claims

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EngineMetadata {
    pub handle: &'static str,
    pub extensions: &'static [&'static str],
}

/// Returned by `Engine::info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EngineInfo {
    pub engine: &'static str,
}

pub const METADATA: EngineMetadata = EngineMetadata {
    handle: "es6",
    extensions: &[".js"],
};
