use std::{fmt::Display, sync::Arc};

use tracing::info;
use vulkano::{
    buffer::{BufferContents, BufferUsage, CpuAccessibleBuffer},
    command_buffer::{AutoCommandBufferBuilder, CommandBufferUsage},
    descriptor_set::{PersistentDescriptorSet, WriteDescriptorSet},
    device::{physical::PhysicalDeviceType, Device, DeviceCreateInfo, DeviceExtensions, Queue, QueueCreateInfo},
    instance::{Instance, InstanceCreateInfo},
    pipeline::{ComputePipeline, Pipeline, PipelineBindPoint},
    shader::ShaderModule,
    sync::{self, GpuFuture},
    VulkanLibrary,
};

use crate::{Error, Result};

/// Invocations per workgroup; every kernel declares `local_size_x = 64`.
pub const WORKGROUP_SIZE: u32 = 64;

pub(crate) fn device_error<E: Display>(e: E) -> Error {
    Error::Device(e.to_string())
}

/// A Vulkan device and the compute queue kernels are submitted to.
#[derive(Debug)]
pub struct ComputeDevice {
    device: Arc<Device>,
    queue: Arc<Queue>,
}

impl ComputeDevice {
    /// Picks the most capable device with a compute queue, discrete GPUs first.
    pub fn new() -> Result<Self> {
        let library = VulkanLibrary::new().map_err(device_error)?;
        let instance = Instance::new(
            library,
            InstanceCreateInfo {
                // MoltenVK and other non-conformant implementations
                enumerate_portability: true,
                ..Default::default()
            },
        )
        .map_err(device_error)?;

        let device_extensions = DeviceExtensions {
            khr_storage_buffer_storage_class: true,
            ..DeviceExtensions::empty()
        };
        let (physical_device, queue_family_index) = instance
            .enumerate_physical_devices()
            .map_err(device_error)?
            .filter(|p| p.supported_extensions().contains(&device_extensions))
            .filter_map(|p| {
                p.queue_family_properties()
                    .iter()
                    .position(|q| q.queue_flags.compute)
                    .map(|i| (p, i as u32))
            })
            .min_by_key(|(p, _)| match p.properties().device_type {
                PhysicalDeviceType::DiscreteGpu => 0,
                PhysicalDeviceType::IntegratedGpu => 1,
                PhysicalDeviceType::VirtualGpu => 2,
                PhysicalDeviceType::Cpu => 3,
                PhysicalDeviceType::Other => 4,
                _ => 5,
            })
            .ok_or_else(|| Error::Device("no Vulkan device with a compute queue".to_string()))?;

        info!(
            device = %physical_device.properties().device_name,
            kind = ?physical_device.properties().device_type,
            "using compute device"
        );

        let (device, mut queues) = Device::new(
            physical_device,
            DeviceCreateInfo {
                enabled_extensions: device_extensions,
                queue_create_infos: vec![QueueCreateInfo {
                    queue_family_index,
                    ..Default::default()
                }],
                ..Default::default()
            },
        )
        .map_err(device_error)?;

        let queue = queues.next().ok_or_else(|| Error::Device("device exposes no queue".to_string()))?;

        Ok(Self { device, queue })
    }

    pub fn pipeline<E, F>(&self, shader_factory: F) -> Result<Arc<ComputePipeline>>
    where
        E: Display,
        F: FnOnce(Arc<Device>) -> std::result::Result<Arc<ShaderModule>, E>,
    {
        let shader = shader_factory(self.device.clone()).map_err(device_error)?;
        let entry_point = shader
            .entry_point("main")
            .ok_or_else(|| Error::Device("shader has no `main` entry point".to_string()))?;
        ComputePipeline::new(self.device.clone(), entry_point, &(), None, |_| {}).map_err(device_error)
    }

    pub fn upload<T, I>(&self, data: I) -> Result<Arc<CpuAccessibleBuffer<[T]>>>
    where
        [T]: BufferContents,
        I: IntoIterator<Item = T>,
        I::IntoIter: ExactSizeIterator,
    {
        CpuAccessibleBuffer::from_iter(self.device.clone(), storage_usage(), false, data).map_err(device_error)
    }

    pub fn upload_data<T: BufferContents>(&self, data: T) -> Result<Arc<CpuAccessibleBuffer<T>>> {
        CpuAccessibleBuffer::from_data(self.device.clone(), storage_usage(), false, data).map_err(device_error)
    }

    /// Runs `pipeline` over `rows` invocations and blocks until the queue is idle.
    pub fn dispatch(
        &self,
        pipeline: &Arc<ComputePipeline>,
        rows: usize,
        writes: impl IntoIterator<Item = WriteDescriptorSet>,
    ) -> Result<()> {
        let layout = pipeline
            .layout()
            .set_layouts()
            .get(0)
            .ok_or_else(|| Error::Device("pipeline has no descriptor set layout".to_string()))?;
        let set = PersistentDescriptorSet::new(layout.clone(), writes).map_err(device_error)?;

        let mut builder = AutoCommandBufferBuilder::primary(
            self.device.clone(),
            self.queue.queue_family_index(),
            CommandBufferUsage::OneTimeSubmit,
        )
        .map_err(device_error)?;

        builder
            .bind_pipeline_compute(pipeline.clone())
            .bind_descriptor_sets(PipelineBindPoint::Compute, pipeline.layout().clone(), 0, set)
            .dispatch([workgroups(rows), 1, 1])
            .map_err(device_error)?;
        let command_buffer = builder.build().map_err(device_error)?;

        sync::now(self.device.clone())
            .then_execute(self.queue.clone(), command_buffer)
            .map_err(device_error)?
            .then_signal_fence_and_flush()
            .map_err(device_error)?
            .wait(None)
            .map_err(device_error)
    }
}

/// Copies a single-precision buffer back into `out`, widening every value.
pub fn download(buffer: &CpuAccessibleBuffer<[f32]>, out: &mut [f64]) -> Result<()> {
    let data = buffer.read().map_err(device_error)?;
    for (o, v) in out.iter_mut().zip(data.iter()) {
        *o = *v as f64;
    }
    Ok(())
}

fn storage_usage() -> BufferUsage {
    BufferUsage {
        storage_buffer: true,
        ..Default::default()
    }
}

fn workgroups(rows: usize) -> u32 {
    (rows as u32 + WORKGROUP_SIZE - 1) / WORKGROUP_SIZE
}
