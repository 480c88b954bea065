// Domain layer - Selections, artifact naming and loaded artifacts
pub mod artifact;
pub mod loaded;
pub mod selection;
