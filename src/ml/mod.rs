// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// Network, training loop and scoring. Apart from the batcher in
// Layer 4 and the recorder in Layer 6, this is the only place
// that touches Burn tensors.
//
// What's in this layer:
//
//   model.rs          — The emotion CNN
//                       • 3 conv blocks (conv, conv, batch norm,
//                         ReLU, max pool, dropout)
//                       • 2 dense + batch norm layers
//                       • 7-way softmax head
//
//   architecture.rs   — Serialisable layer list for model.json
//
//   early_stopping.rs — Patience counter with best-state snapshot
//
//   trainer.rs        — Forward pass, loss, backward pass, Adam
//                       step, validation and early stopping
//
//   evaluator.rs      — Loss/accuracy, probabilities and the
//                       confusion matrix for a trained model
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)

/// Convolutional emotion classifier
pub mod model;

/// Layer list written to model.json
pub mod architecture;

/// Stop when validation loss stops improving
pub mod early_stopping;

/// Full training loop with validation and early stopping
pub mod trainer;

/// Scoring a trained model
pub mod evaluator;
