//! Workspace and probe geometry settings

/// Default probe offset from the first tool (X, Y, Z)
const DEFAULT_PROBE_OFFSET: [f32; 3] = [10.0, 10.0, 0.0];

/// Workspace offsets and probe geometry
#[derive(Debug, Clone, PartialEq)]
pub struct GeometrySettings {
    /// Home position offset (X, Y, Z)
    pub home_offset: [f32; 3],
    /// Second tool offset relative to the first (meaningful with `TOOL_OFFSETS`)
    pub tool_offset: [f32; 3],
    /// Probe offset from the first tool (meaningful with `BED_PROBE`)
    pub probe_offset: [f32; 3],
}

impl Default for GeometrySettings {
    fn default() -> Self {
        Self {
            home_offset: [0.0; 3],
            tool_offset: [0.0; 3],
            probe_offset: DEFAULT_PROBE_OFFSET,
        }
    }
}
