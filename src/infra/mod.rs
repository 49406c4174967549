// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Everything that writes training results to disk:
//
//   exporter.rs — Saving and loading the trained model
//                 model.json holds the architecture, model.bin
//                 the full-precision weights written by Burn's
//                 BinFileRecorder.
//
//   metrics.rs  — Training history logging
//                 Writes epoch-level loss and accuracy to
//                 training_history.csv for later plotting.
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Records)

/// model.json + model.bin export and reload
pub mod exporter;

/// Training history CSV logger
pub mod metrics;
