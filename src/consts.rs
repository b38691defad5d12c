// Names baked into rewritten classes and global safety caps

// Class declaring the two accessor bootstrap entry points
pub const DEFAULT_BOOTSTRAP_OWNER: &str = "fieldlink/runtime/AccessorMetafactory";
pub const GETTER_BOOTSTRAP_NAME: &str = "getterMetafactory";
pub const SETTER_BOOTSTRAP_NAME: &str = "setterMetafactory";

// (Lookup, String name, MethodType, String className, String fieldName) -> CallSite
pub const BOOTSTRAP_DESCRIPTOR: &str = "(Ljava/lang/invoke/MethodHandles$Lookup;Ljava/lang/String;Ljava/lang/invoke/MethodType;Ljava/lang/String;Ljava/lang/String;)Ljava/lang/invoke/CallSite;";

// Call site name prefixes
pub const GETTER_PREFIX: &str = "getter$$";
pub const SETTER_PREFIX: &str = "setter$$";

// First class file major version with invokedynamic
pub const INVOKEDYNAMIC_MIN_MAJOR: u16 = 51;

// Interpreter: instruction budget per top-level invocation
pub const DEFAULT_MAX_STEPS: usize = 5_000_000;
// Interpreter: maximum nested invocation depth
pub const MAX_CALL_DEPTH: usize = 512;
