use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use vulkano::{descriptor_set::WriteDescriptorSet, pipeline::ComputePipeline};

use super::{
    check_hidden_errors, check_layer_output, check_output_errors, check_update_weights,
    device::{download, ComputeDevice},
    ComputeBackend, Precision,
};
use crate::{Activation, Cluster, Result};

mod layer_output_cs {
    vulkano_shaders::shader! {
        ty: "compute",
        src: "
            #version 450

            layout(local_size_x = 64, local_size_y = 1, local_size_z = 1) in;

            layout(set = 0, binding = 0) buffer Params {
                uint rows;
                uint fan_in;
                uint count;
                uint activation;
                float rate;
            } params;
            layout(set = 0, binding = 1) buffer LayerIn { float values[]; } layer_in;
            layout(set = 0, binding = 2) buffer Weights { float values[]; } cluster;
            layout(set = 0, binding = 3) buffer LayerOut { float values[]; } layer_out;

            float activate(uint kind, float x) {
                if (kind == 0) return 1.0 / (1.0 + exp(-x));
                if (kind == 1) return max(x, 0.0);
                if (kind == 2) return tanh(x);
                if (kind == 3) return sign(x) * sqrt(abs(x));
                return sign(x) * pow(abs(x), 1.0 / 3.0);
            }

            void main() {
                uint i = gl_GlobalInvocationID.x;
                if (i >= params.rows) return;

                uint cols = params.fan_in + 1;
                float sum = cluster.values[i * cols + params.fan_in];
                for (uint j = 0; j < params.fan_in; ++j) {
                    sum += layer_in.values[j] * cluster.values[i * cols + j];
                }
                layer_out.values[i] = activate(params.activation, sum);
            }
        "
    }
}

mod hidden_errors_cs {
    vulkano_shaders::shader! {
        ty: "compute",
        src: "
            #version 450

            layout(local_size_x = 64, local_size_y = 1, local_size_z = 1) in;

            layout(set = 0, binding = 0) buffer Params {
                uint rows;
                uint fan_in;
                uint count;
                uint activation;
                float rate;
            } params;
            layout(set = 0, binding = 1) buffer FinalWeights { float values[]; } final_cluster;
            layout(set = 0, binding = 2) buffer FinalErrors { float values[]; } final_errors;
            layout(set = 0, binding = 3) buffer Hidden { float values[]; } hidden;
            layout(set = 0, binding = 4) buffer HiddenErrors { float values[]; } hidden_errors;

            float derivative(uint kind, float y) {
                if (kind == 0) return y * (1.0 - y);
                if (kind == 1) return y > 0.0 ? 1.0 : 0.0;
                if (kind == 2) return 1.0 - y * y;
                if (y == 0.0) return 0.0;
                if (kind == 3) return 1.0 / (2.0 * y);
                return 1.0 / (3.0 * y * y);
            }

            void main() {
                uint h = gl_GlobalInvocationID.x;
                if (h >= params.rows) return;

                uint cols = params.fan_in + 1;
                float sum = 0.0;
                for (uint o = 0; o < params.count; ++o) {
                    sum += final_errors.values[o] * final_cluster.values[o * cols + h];
                }
                hidden_errors.values[h] = sum * params.rate * derivative(params.activation, hidden.values[h]);
            }
        "
    }
}

mod output_errors_cs {
    vulkano_shaders::shader! {
        ty: "compute",
        src: "
            #version 450

            layout(local_size_x = 64, local_size_y = 1, local_size_z = 1) in;

            layout(set = 0, binding = 0) buffer Params {
                uint rows;
                uint fan_in;
                uint count;
                uint activation;
                float rate;
            } params;
            layout(set = 0, binding = 1) buffer FinalErrors { float values[]; } final_errors;
            layout(set = 0, binding = 2) buffer OutputLayer { float values[]; } output_layer;

            float derivative(uint kind, float y) {
                if (kind == 0) return y * (1.0 - y);
                if (kind == 1) return y > 0.0 ? 1.0 : 0.0;
                if (kind == 2) return 1.0 - y * y;
                if (y == 0.0) return 0.0;
                if (kind == 3) return 1.0 / (2.0 * y);
                return 1.0 / (3.0 * y * y);
            }

            void main() {
                uint o = gl_GlobalInvocationID.x;
                if (o >= params.rows) return;

                final_errors.values[o] *= params.rate * derivative(params.activation, output_layer.values[o]);
            }
        "
    }
}

mod update_weights_cs {
    vulkano_shaders::shader! {
        ty: "compute",
        src: "
            #version 450

            layout(local_size_x = 64, local_size_y = 1, local_size_z = 1) in;

            layout(set = 0, binding = 0) buffer Params {
                uint rows;
                uint fan_in;
                uint count;
                uint activation;
                float rate;
            } params;
            layout(set = 0, binding = 1) buffer Weights { float values[]; } cluster;
            layout(set = 0, binding = 2) buffer Inputs { float values[]; } inputs;
            layout(set = 0, binding = 3) buffer Errors { float values[]; } errors;

            void main() {
                uint r = gl_GlobalInvocationID.x;
                if (r >= params.rows) return;

                uint cols = params.fan_in + 1;
                float e = errors.values[r];
                for (uint c = 0; c < params.fan_in; ++c) {
                    cluster.values[r * cols + c] += e * inputs.values[c];
                }
                cluster.values[r * cols + params.fan_in] += e;
            }
        "
    }
}

/// Mirrors the `Params` block every kernel reads at binding 0.
#[repr(C)]
#[derive(Copy, Clone, Default, Debug, Pod, Zeroable)]
struct KernelParams {
    rows: u32,
    fan_in: u32,
    count: u32,
    activation: u32,
    rate: f32,
}

impl KernelParams {
    fn new(rows: usize, fan_in: usize) -> Self {
        Self { rows: rows as u32, fan_in: fan_in as u32, ..Default::default() }
    }

    fn count(mut self, count: usize) -> Self {
        self.count = count as u32;
        self
    }

    fn activation(mut self, activation: Activation) -> Self {
        self.activation = activation.shader_code();
        self
    }

    fn rate(mut self, rate: f64) -> Self {
        self.rate = rate as f32;
        self
    }
}

fn narrow(values: &[f64]) -> impl ExactSizeIterator<Item = f32> + '_ {
    values.iter().map(|v| *v as f32)
}

/// Vulkan backend. Every kernel call narrows its operands to `f32`, runs on
/// the device, then widens the result back into the caller's `f64` buffer.
pub struct Gpu {
    device: ComputeDevice,
    layer_output: Arc<ComputePipeline>,
    hidden_errors: Arc<ComputePipeline>,
    output_errors: Arc<ComputePipeline>,
    update_weights: Arc<ComputePipeline>,
}

impl Gpu {
    pub fn new() -> Result<Self> {
        let device = ComputeDevice::new()?;
        Ok(Self {
            layer_output: device.pipeline(layer_output_cs::load)?,
            hidden_errors: device.pipeline(hidden_errors_cs::load)?,
            output_errors: device.pipeline(output_errors_cs::load)?,
            update_weights: device.pipeline(update_weights_cs::load)?,
            device,
        })
    }
}

impl ComputeBackend for Gpu {
    fn name(&self) -> &'static str { "gpu" }

    fn precision(&self) -> Precision { Precision::Single }

    fn layer_output(&self, input: &[f64], cluster: &Cluster, activation: Activation, out: &mut [f64]) -> Result<()> {
        check_layer_output(input, cluster, out)?;
        let params = KernelParams::new(cluster.rows(), cluster.fan_in()).activation(activation);
        let layer_out = self.device.upload(narrow(out))?;
        self.device.dispatch(
            &self.layer_output,
            cluster.rows(),
            [
                WriteDescriptorSet::buffer(0, self.device.upload_data(params)?),
                WriteDescriptorSet::buffer(1, self.device.upload(narrow(input))?),
                WriteDescriptorSet::buffer(2, self.device.upload(narrow(cluster.as_slice()))?),
                WriteDescriptorSet::buffer(3, layer_out.clone()),
            ],
        )?;
        download(&layer_out, out)
    }

    fn hidden_errors(
        &self,
        final_cluster: &Cluster,
        final_errors: &[f64],
        hidden: &[f64],
        rate: f64,
        activation: Activation,
        out: &mut [f64],
    ) -> Result<()> {
        check_hidden_errors(final_cluster, final_errors, hidden, out)?;
        let params = KernelParams::new(hidden.len(), final_cluster.fan_in())
            .count(final_cluster.rows())
            .activation(activation)
            .rate(rate);
        let hidden_errors = self.device.upload(narrow(out))?;
        self.device.dispatch(
            &self.hidden_errors,
            hidden.len(),
            [
                WriteDescriptorSet::buffer(0, self.device.upload_data(params)?),
                WriteDescriptorSet::buffer(1, self.device.upload(narrow(final_cluster.as_slice()))?),
                WriteDescriptorSet::buffer(2, self.device.upload(narrow(final_errors))?),
                WriteDescriptorSet::buffer(3, self.device.upload(narrow(hidden))?),
                WriteDescriptorSet::buffer(4, hidden_errors.clone()),
            ],
        )?;
        download(&hidden_errors, out)
    }

    fn output_errors(&self, final_errors: &mut [f64], output: &[f64], rate: f64, activation: Activation) -> Result<()> {
        check_output_errors(final_errors, output)?;
        let params = KernelParams::new(output.len(), 0).activation(activation).rate(rate);
        let errors = self.device.upload(narrow(final_errors))?;
        self.device.dispatch(
            &self.output_errors,
            output.len(),
            [
                WriteDescriptorSet::buffer(0, self.device.upload_data(params)?),
                WriteDescriptorSet::buffer(1, errors.clone()),
                WriteDescriptorSet::buffer(2, self.device.upload(narrow(output))?),
            ],
        )?;
        download(&errors, final_errors)
    }

    fn update_weights(&self, cluster: &mut Cluster, input: &[f64], errors: &[f64]) -> Result<()> {
        check_update_weights(cluster, input, errors)?;
        let params = KernelParams::new(cluster.rows(), cluster.fan_in());
        let weights = self.device.upload(narrow(cluster.as_slice()))?;
        self.device.dispatch(
            &self.update_weights,
            cluster.rows(),
            [
                WriteDescriptorSet::buffer(0, self.device.upload_data(params)?),
                WriteDescriptorSet::buffer(1, weights.clone()),
                WriteDescriptorSet::buffer(2, self.device.upload(narrow(input))?),
                WriteDescriptorSet::buffer(3, self.device.upload(narrow(errors))?),
            ],
        )?;
        download(&weights, cluster.as_mut_slice())
    }
}
