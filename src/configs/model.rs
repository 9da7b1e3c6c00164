use serde::{Deserialize, Serialize};

use crate::{
    MlErr, Result,
    arch::{
        Sequential,
        layers::{Conv2d, Layer, MaxPool2d},
    },
};

/// One layer of a `ModelConfig`. Input sizes are inferred from the previous layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayerConfig {
    Conv2d {
        out_channels: usize,
        kernel: usize,
        #[serde(default)]
        padding: usize,
    },
    MaxPool2d {
        window: usize,
    },
    Dense {
        out: usize,
    },
    Relu,
    Dropout {
        p: f32,
    },
}

/// The shape of the activations flowing between two layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Image(usize, usize, usize),
    Flat(usize),
}

impl Shape {
    fn len(self) -> usize {
        match self {
            Shape::Image(c, h, w) => c * h * w,
            Shape::Flat(n) => n,
        }
    }
}

/// A sequential classifier over channel-first images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Channels, height and width of the input images.
    pub input: (usize, usize, usize),
    pub layers: Vec<LayerConfig>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self::cifar_net()
    }
}

impl ModelConfig {
    /// The small LeNet style network used for CIFAR-10.
    pub fn cifar_net() -> Self {
        Self {
            input: (3, 32, 32),
            layers: vec![
                LayerConfig::Conv2d {
                    out_channels: 6,
                    kernel: 5,
                    padding: 0,
                },
                LayerConfig::Relu,
                LayerConfig::MaxPool2d { window: 2 },
                LayerConfig::Conv2d {
                    out_channels: 16,
                    kernel: 5,
                    padding: 0,
                },
                LayerConfig::Relu,
                LayerConfig::MaxPool2d { window: 2 },
                LayerConfig::Dense { out: 120 },
                LayerConfig::Relu,
                LayerConfig::Dense { out: 84 },
                LayerConfig::Relu,
                LayerConfig::Dense { out: 10 },
            ],
        }
    }

    /// Builds the layers, checking that every one of them fits the output of the previous.
    ///
    /// # Errors
    /// `MlErr::InvalidInput` if a spatial layer follows a dense one or a layer doesn't fit.
    pub fn build(&self, seed: u64) -> Result<Sequential> {
        let (c, h, w) = self.input;
        let mut shape = Shape::Image(c, h, w);
        let mut layers = Vec::with_capacity(self.layers.len());

        for (i, config) in self.layers.iter().enumerate() {
            let (layer, next) = match (*config, shape) {
                (
                    LayerConfig::Conv2d {
                        out_channels,
                        kernel,
                        padding,
                    },
                    Shape::Image(c, h, w),
                ) => {
                    let conv = Conv2d::new((c, h, w), out_channels, kernel, padding)?;
                    let (c, h, w) = conv.output_shape();
                    (Layer::Conv2d(conv), Shape::Image(c, h, w))
                }
                (LayerConfig::MaxPool2d { window }, Shape::Image(c, h, w)) => {
                    let pool = MaxPool2d::new((c, h, w), window)?;
                    let (c, h, w) = pool.output_shape();
                    (Layer::MaxPool2d(pool), Shape::Image(c, h, w))
                }
                (LayerConfig::Conv2d { .. } | LayerConfig::MaxPool2d { .. }, Shape::Flat(_)) => {
                    return Err(MlErr::invalid_input(format!(
                        "layer {i} needs an image input but follows a dense layer"
                    )));
                }
                (LayerConfig::Dense { out }, shape) => {
                    (Layer::dense((shape.len(), out)), Shape::Flat(out))
                }
                (LayerConfig::Relu, shape) => (Layer::relu(shape.len()), shape),
                (LayerConfig::Dropout { p }, shape) => (Layer::dropout(shape.len(), p)?, shape),
            };

            layers.push(layer);
            shape = next;
        }

        Sequential::new(layers, seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::Model;

    #[test]
    fn cifar_net_shapes() {
        let net = ModelConfig::cifar_net().build(0).unwrap();
        assert_eq!(net.input_size(), 3 * 32 * 32);
        assert_eq!(net.num_classes(), 10);

        let sizes: Vec<_> = net.layers().iter().map(Layer::output_size).collect();
        assert_eq!(sizes[2], 6 * 14 * 14);
        assert_eq!(sizes[5], 400);

        let expected = (3 * 25 + 1) * 6 + (6 * 25 + 1) * 16 + 401 * 120 + 121 * 84 + 85 * 10;
        assert_eq!(net.size(), expected);
    }

    #[test]
    fn rejects_images_after_dense() {
        let config = ModelConfig {
            input: (1, 4, 4),
            layers: vec![LayerConfig::Dense { out: 4 }, LayerConfig::MaxPool2d { window: 2 }],
        };
        assert!(matches!(config.build(0), Err(MlErr::InvalidInput(_))));
    }

    #[test]
    fn reads_from_json() {
        let json = r#"{
            "input": [1, 8, 8],
            "layers": [
                { "kind": "conv2d", "out_channels": 2, "kernel": 3, "padding": 1 },
                { "kind": "relu" },
                { "kind": "max_pool2d", "window": 2 },
                { "kind": "dropout", "p": 0.25 },
                { "kind": "dense", "out": 3 }
            ]
        }"#;

        let config: ModelConfig = serde_json::from_str(json).unwrap();
        let net = config.build(1).unwrap();
        assert_eq!(net.input_size(), 64);
        assert_eq!(net.layers()[3].input_size(), 2 * 4 * 4);
        assert_eq!(net.num_classes(), 3);
    }
}
