// ============================================================
// Layer 5 — Architecture Description
// ============================================================
// A human-readable, serialisable description of the network:
// one entry per layer with its type, hyperparameters and output
// shape (batch dimension omitted, channels-last like the input).
//
// The description is derived from EmotionCnnConfig, so the pair
// (config, layers) written to model.json is enough to rebuild
// the exact same module tree before loading weights.
//
//   input            [48, 48, 1]
//   block1.conv_a    Conv2d 64  3x3 same      [48, 48, 64]
//   block1.conv_b    Conv2d 64  3x3 same      [48, 48, 64]
//   block1.norm      BatchNormalization       [48, 48, 64]
//   block1.relu      Activation relu          [48, 48, 64]
//   block1.pool      MaxPooling2d 2x2 / 2     [24, 24, 64]
//   block1.dropout   Dropout 0.2              [24, 24, 64]
//   ...
//   output           Dense 7 softmax          [7]

use serde::{Deserialize, Serialize};

use crate::domain::record::Emotion;
use crate::ml::model::{conv_output, pool_output, EmotionCnnConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Padding {
    Same,
    Valid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "class_name")]
pub enum LayerSpec {
    Conv2d {
        name:         String,
        filters:      usize,
        kernel_size:  [usize; 2],
        strides:      [usize; 2],
        padding:      Padding,
        output_shape: Vec<usize>,
    },
    BatchNormalization {
        name:         String,
        momentum:     f64,
        epsilon:      f64,
        output_shape: Vec<usize>,
    },
    Activation {
        name:         String,
        activation:   String,
        output_shape: Vec<usize>,
    },
    MaxPooling2d {
        name:         String,
        pool_size:    [usize; 2],
        strides:      [usize; 2],
        output_shape: Vec<usize>,
    },
    Dropout {
        name:         String,
        rate:         f64,
        output_shape: Vec<usize>,
    },
    Flatten {
        name:         String,
        output_shape: Vec<usize>,
    },
    Dense {
        name:         String,
        units:        usize,
        activation:   Option<String>,
        output_shape: Vec<usize>,
    },
}

impl LayerSpec {
    pub fn name(&self) -> &str {
        match self {
            LayerSpec::Conv2d { name, .. }
            | LayerSpec::BatchNormalization { name, .. }
            | LayerSpec::Activation { name, .. }
            | LayerSpec::MaxPooling2d { name, .. }
            | LayerSpec::Dropout { name, .. }
            | LayerSpec::Flatten { name, .. }
            | LayerSpec::Dense { name, .. } => name,
        }
    }

    pub fn output_shape(&self) -> &[usize] {
        match self {
            LayerSpec::Conv2d { output_shape, .. }
            | LayerSpec::BatchNormalization { output_shape, .. }
            | LayerSpec::Activation { output_shape, .. }
            | LayerSpec::MaxPooling2d { output_shape, .. }
            | LayerSpec::Dropout { output_shape, .. }
            | LayerSpec::Flatten { output_shape, .. }
            | LayerSpec::Dense { output_shape, .. } => output_shape,
        }
    }

    /// Short one-line summary used by the model summary printout.
    pub fn describe(&self) -> String {
        match self {
            LayerSpec::Conv2d { filters, kernel_size, strides, padding, .. } => format!(
                "Conv2d {filters} {}x{} stride {} {:?}",
                kernel_size[0], kernel_size[1], strides[0], padding
            ),
            LayerSpec::BatchNormalization { .. } => "BatchNormalization".to_string(),
            LayerSpec::Activation { activation, .. } => format!("Activation {activation}"),
            LayerSpec::MaxPooling2d { pool_size, strides, .. } => format!(
                "MaxPooling2d {}x{} / {}",
                pool_size[0], pool_size[1], strides[0]
            ),
            LayerSpec::Dropout { rate, .. } => format!("Dropout {rate}"),
            LayerSpec::Flatten { .. } => "Flatten".to_string(),
            LayerSpec::Dense { units, activation, .. } => match activation {
                Some(a) => format!("Dense {units} {a}"),
                None    => format!("Dense {units}"),
            },
        }
    }
}

impl EmotionCnnConfig {
    /// Layer list in forward order, derived from this config.
    pub fn layers(&self) -> Vec<LayerSpec> {
        let mut layers = Vec::new();
        let (mut h, mut w) = (self.height, self.width);

        for (i, block) in self.blocks().iter().enumerate() {
            let prefix = format!("block{}", i + 1);
            let c      = block.filters;
            let kernel = [block.kernel, block.kernel];

            layers.push(LayerSpec::Conv2d {
                name:         format!("{prefix}.conv_a"),
                filters:      c,
                kernel_size:  kernel,
                strides:      [1, 1],
                padding:      Padding::Same,
                output_shape: vec![h, w, c],
            });

            let s           = block.second_stride;
            let second_same = s == 1;
            h = conv_output(h, block.kernel, s, second_same);
            w = conv_output(w, block.kernel, s, second_same);
            layers.push(LayerSpec::Conv2d {
                name:         format!("{prefix}.conv_b"),
                filters:      c,
                kernel_size:  kernel,
                strides:      [s, s],
                padding:      if second_same { Padding::Same } else { Padding::Valid },
                output_shape: vec![h, w, c],
            });
            layers.push(LayerSpec::BatchNormalization {
                name:         format!("{prefix}.norm"),
                momentum:     1.0 - self.bn_momentum,
                epsilon:      self.bn_epsilon,
                output_shape: vec![h, w, c],
            });
            layers.push(LayerSpec::Activation {
                name:         format!("{prefix}.relu"),
                activation:   "relu".to_string(),
                output_shape: vec![h, w, c],
            });

            h = pool_output(h);
            w = pool_output(w);
            layers.push(LayerSpec::MaxPooling2d {
                name:         format!("{prefix}.pool"),
                pool_size:    [2, 2],
                strides:      [2, 2],
                output_shape: vec![h, w, c],
            });
            layers.push(LayerSpec::Dropout {
                name:         format!("{prefix}.dropout"),
                rate:         self.dropout,
                output_shape: vec![h, w, c],
            });
        }

        let units = self.dense_units;
        layers.push(LayerSpec::Flatten {
            name:         "flatten".to_string(),
            output_shape: vec![self.flattened_features()],
        });
        for (dense, norm) in [("dense1", "norm1"), ("dense2", "norm2")] {
            layers.push(LayerSpec::Dense {
                name:         dense.to_string(),
                units,
                activation:   None,
                output_shape: vec![units],
            });
            layers.push(LayerSpec::BatchNormalization {
                name:         norm.to_string(),
                momentum:     1.0 - self.bn_momentum,
                epsilon:      self.bn_epsilon,
                output_shape: vec![units],
            });
        }
        layers.push(LayerSpec::Dropout {
            name:         "dropout".to_string(),
            rate:         self.dropout,
            output_shape: vec![units],
        });
        layers.push(LayerSpec::Dense {
            name:         "output".to_string(),
            units:        self.num_classes,
            activation:   Some("softmax".to_string()),
            output_shape: vec![self.num_classes],
        });

        layers
    }

    /// Keras-style summary table.
    pub fn summary(&self) -> String {
        let mut lines = vec![format!("{:<16} {:<32} {}", "input", "", format!("{:?}", [self.height, self.width, 1]))];
        lines.extend(self.layers().iter().map(|layer| {
            format!("{:<16} {:<32} {:?}", layer.name(), layer.describe(), layer.output_shape())
        }));
        lines.join("\n")
    }
}

/// Contents of model.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchitectureDocument {
    pub format_version: u32,
    pub input_shape:    [usize; 3],
    pub num_classes:    usize,
    pub class_names:    Vec<String>,
    pub config:         EmotionCnnConfig,
    pub layers:         Vec<LayerSpec>,
}

impl ArchitectureDocument {
    pub const FORMAT_VERSION: u32 = 1;

    pub fn from_config(config: &EmotionCnnConfig) -> Self {
        let class_names = (0..config.num_classes)
            .map(|i| {
                Emotion::from_index(i)
                    .map(|e| e.name().to_string())
                    .unwrap_or_else(|| format!("class_{i}"))
            })
            .collect();

        Self {
            format_version: Self::FORMAT_VERSION,
            input_shape:    [config.height, config.width, 1],
            num_classes:    config.num_classes,
            class_names,
            config:         config.clone(),
            layers:         config.layers(),
        }
    }

    /// The stored layer list must be exactly what the stored config
    /// produces, otherwise the weights cannot be trusted to fit.
    pub fn is_consistent(&self) -> bool {
        self.format_version == Self::FORMAT_VERSION
            && self.input_shape == [self.config.height, self.config.width, 1]
            && self.num_classes == self.config.num_classes
            && self.class_names.len() == self.num_classes
            && self.layers == self.config.layers()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fer_layer_list() {
        let layers = EmotionCnnConfig::new().layers();

        // 3 blocks x 6 layers + flatten + 2 x (dense, norm) + dropout + output
        assert_eq!(layers.len(), 3 * 6 + 1 + 4 + 1 + 1);
        assert_eq!(layers[0].output_shape(), &[48, 48, 64]);
        assert_eq!(layers[4].output_shape(), &[24, 24, 64]);

        let block3_stride = &layers[13];
        assert_eq!(block3_stride.name(), "block3.conv_b");
        assert!(matches!(
            block3_stride,
            LayerSpec::Conv2d { filters: 256, kernel_size: [1, 1], strides: [2, 2], padding: Padding::Valid, .. }
        ));
        assert_eq!(block3_stride.output_shape(), &[6, 6, 256]);

        let flatten = layers.iter().find(|l| l.name() == "flatten").unwrap();
        assert_eq!(flatten.output_shape(), &[2304]);

        let last = layers.last().unwrap();
        assert!(matches!(last, LayerSpec::Dense { units: 7, activation: Some(a), .. } if a == "softmax"));
    }

    #[test]
    fn test_document_json_is_consistent_after_round_trip() {
        let doc  = ArchitectureDocument::from_config(&EmotionCnnConfig::new());
        let json = serde_json::to_string_pretty(&doc).unwrap();
        assert!(json.contains("\"class_name\": \"Conv2d\""));
        assert!(json.contains("Surprise"));

        let back: ArchitectureDocument = serde_json::from_str(&json).unwrap();
        assert!(back.is_consistent());
        assert_eq!(back.layers, doc.layers);
    }

    #[test]
    fn test_tampered_document_is_inconsistent() {
        let mut doc = ArchitectureDocument::from_config(&EmotionCnnConfig::new());
        doc.config.dense_units = 64;
        assert!(!doc.is_consistent());
    }

    #[test]
    fn test_summary_mentions_every_layer() {
        let cfg     = EmotionCnnConfig::new();
        let summary = cfg.summary();
        for layer in cfg.layers() {
            assert!(summary.contains(layer.name()));
        }
    }
}
