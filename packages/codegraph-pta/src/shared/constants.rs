//! Centralized analysis constants
//!
//! Names the analysis matches against IR identifiers, plus capacity hints.

/// Well-known IR names
pub mod names {
    /// Name of the implicit global object local
    pub const GLOBAL_THIS_NAME: &str = "globalThis";

    /// Name of the receiver local in instance methods
    pub const THIS_NAME: &str = "this";

    /// File name used by the front-end for unresolved signatures
    pub const UNKNOWN_FILE_NAME: &str = "%unk";

    /// Method name of the per-file / per-namespace top-level method
    pub const DEFAULT_METHOD_NAME: &str = "%dflt";

    /// Iteration callback method recognized on containers
    pub const FOR_EACH_METHOD_NAME: &str = "forEach";
}

/// Built-in classes and methods modelled by hand
pub mod builtin {
    pub const SET_CLASS: &str = "Set";
    pub const MAP_CLASS: &str = "Map";
    pub const ARRAY_CLASS: &str = "Array";
    pub const FUNCTION_CLASS: &str = "Function";

    pub const SET_ADD: &str = "add";
    pub const MAP_SET: &str = "set";
    pub const FUNCTION_CALL: &str = "call";
    pub const FUNCTION_APPLY: &str = "apply";
    pub const FUNCTION_BIND: &str = "bind";

    /// Classes whose allocations get a synthetic element node
    pub const CONTAINER_CLASSES: &[&str] = &[SET_CLASS, MAP_CLASS, ARRAY_CLASS];
}

/// Storage / property-link API
pub mod storage {
    pub const APP_STORAGE_CLASS: &str = "AppStorage";
    pub const SUBSCRIBED_PROPERTY_CLASS: &str = "SubscribedAbstractProperty";

    pub const SET_OR_CREATE: &str = "setOrCreate";
    pub const LINK: &str = "link";
    pub const PROP: &str = "prop";
    pub const SET: &str = "set";
    pub const GET: &str = "get";
}

/// Debug output
pub mod dump {
    /// Statistics file written when `debug_dump` is enabled
    pub const STATS_FILE_NAME: &str = "pta_stats.json";
}

/// Initial capacities for PAG arenas (reduces reallocations)
pub mod capacity {
    pub const INITIAL_NODE_CAPACITY: usize = 1024;
    pub const INITIAL_EDGE_CAPACITY: usize = 2048;
}
