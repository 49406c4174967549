// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs, enums and traits that define the core
// concepts of the pipeline: a labelled face record, the usage
// partition it belongs to, the emotion classes and the error
// taxonomy shared by every stage.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits
//
// Reference: Rust Book §5 (Structs), §6 (Enums), §10 (Traits)

// One typed row of the FER-2013 CSV, plus partition and class enums
pub mod record;

// Typed pipeline errors (file, parse, shape, empty partition)
pub mod error;

// Core abstractions (traits) that other layers implement
pub mod traits;
