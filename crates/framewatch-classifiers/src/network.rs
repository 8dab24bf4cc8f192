//! Sequential candle network built from a model descriptor

use crate::model_config::{LayerSpec, ModelDescriptor};
use candle_core::{Tensor, D};
use candle_nn::{Conv2d, Conv2dConfig, Linear, Module, VarBuilder};
use framewatch_core::{Error, Result};

/// Activation shape tracked while building, batch axis excluded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Activation {
    /// Channels, height, width
    Spatial(usize, usize, usize),
    /// Flat feature vector
    Flat(usize),
}

impl Activation {
    fn features(self) -> usize {
        match self {
            Activation::Spatial(c, h, w) => c * h * w,
            Activation::Flat(n) => n,
        }
    }
}

enum Layer {
    Conv2d(Conv2d),
    MaxPool2d(usize),
    Relu,
    Flatten,
    Dense(Linear),
    Softmax,
    Identity,
}

/// Feed-forward stack of layers operating on NCHW input
pub struct Sequential {
    layers: Vec<Layer>,
    output_features: usize,
}

impl Sequential {
    /// Build the network, pulling weights from `vb`
    ///
    /// Shapes are checked layer by layer so a descriptor that does not fit
    /// its input shape or label count fails here rather than on the first
    /// frame.
    pub fn build(descriptor: &ModelDescriptor, vb: VarBuilder) -> Result<Self> {
        let size = descriptor
            .input_size()
            .ok_or_else(|| Error::model_load("descriptor does not declare an input size"))?;

        let mut shape = Activation::Spatial(descriptor.input_channels(), size, size);
        let mut layers = Vec::with_capacity(descriptor.layers.len());

        for (index, spec) in descriptor.layers.iter().enumerate() {
            let layer_vb = vb.pp(format!("layers.{}", index));
            let (layer, next) = build_layer(index, spec, shape, layer_vb)?;
            layers.push(layer);
            shape = next;
        }

        let output_features = match shape {
            Activation::Flat(n) => n,
            Activation::Spatial(..) => {
                return Err(Error::model_load(
                    "network output is still spatial; add flatten and dense layers",
                ))
            }
        };

        if output_features != descriptor.labels.len() {
            return Err(Error::model_load(format!(
                "network produces {} outputs but {} labels are declared",
                output_features,
                descriptor.labels.len()
            )));
        }

        Ok(Self {
            layers,
            output_features,
        })
    }

    /// Number of values produced per batch item
    pub fn output_features(&self) -> usize {
        self.output_features
    }

    /// Run the stack on an NCHW tensor
    pub fn forward(&self, input: &Tensor) -> candle_core::Result<Tensor> {
        let mut x = input.clone();
        for layer in &self.layers {
            x = match layer {
                Layer::Conv2d(conv) => conv.forward(&x)?,
                Layer::MaxPool2d(size) => x.max_pool2d(*size)?,
                Layer::Relu => x.relu()?,
                Layer::Flatten => x.flatten_from(1)?,
                Layer::Dense(linear) => linear.forward(&x)?,
                Layer::Softmax => candle_nn::ops::softmax(&x, D::Minus1)?,
                Layer::Identity => x,
            };
        }
        Ok(x)
    }
}

fn build_layer(
    index: usize,
    spec: &LayerSpec,
    shape: Activation,
    vb: VarBuilder,
) -> Result<(Layer, Activation)> {
    let load_err = |e: candle_core::Error| {
        Error::model_load(format!("Failed to load weights for layer {}: {}", index, e))
    };

    match (spec, shape) {
        (
            LayerSpec::Conv2d {
                filters,
                kernel_size,
                stride,
                padding,
            },
            Activation::Spatial(c, h, w),
        ) => {
            let out_h = conv_output(h, *kernel_size, *stride, *padding);
            let out_w = conv_output(w, *kernel_size, *stride, *padding);
            let (out_h, out_w) = match (out_h, out_w) {
                (Some(oh), Some(ow)) => (oh, ow),
                _ => {
                    return Err(Error::model_load(format!(
                        "layer {}: kernel {} does not fit a {}x{} input",
                        index, kernel_size, h, w
                    )))
                }
            };
            let cfg = Conv2dConfig {
                padding: *padding,
                stride: *stride,
                ..Default::default()
            };
            let conv = candle_nn::conv2d(c, *filters, *kernel_size, cfg, vb).map_err(load_err)?;
            Ok((Layer::Conv2d(conv), Activation::Spatial(*filters, out_h, out_w)))
        }
        (LayerSpec::MaxPool2d { size }, Activation::Spatial(c, h, w)) => {
            if h < *size || w < *size {
                return Err(Error::model_load(format!(
                    "layer {}: pool size {} exceeds {}x{} input",
                    index, size, h, w
                )));
            }
            Ok((Layer::MaxPool2d(*size), Activation::Spatial(c, h / size, w / size)))
        }
        (LayerSpec::Flatten, shape) => Ok((Layer::Flatten, Activation::Flat(shape.features()))),
        (LayerSpec::Dense { units }, Activation::Flat(n)) => {
            let linear = candle_nn::linear(n, *units, vb).map_err(load_err)?;
            Ok((Layer::Dense(linear), Activation::Flat(*units)))
        }
        (LayerSpec::Relu, shape) => Ok((Layer::Relu, shape)),
        (LayerSpec::Softmax, shape) => Ok((Layer::Softmax, shape)),
        (LayerSpec::Dropout { .. }, shape) => Ok((Layer::Identity, shape)),
        (spec, shape) => Err(Error::model_load(format!(
            "layer {}: {:?} cannot follow activation {:?}",
            index, spec, shape
        ))),
    }
}

fn conv_output(input: usize, kernel: usize, stride: usize, padding: usize) -> Option<usize> {
    let padded = input + 2 * padding;
    if padded < kernel {
        return None;
    }
    Some((padded - kernel) / stride + 1)
}
