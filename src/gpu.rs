//! GPU compute backend contract, behind the `gpu` Cargo feature. Ports the
//! teacher's wgpu resource-pool plumbing (see `crate::gpu::resource_pool`,
//! kept as reference) down to the four calls a smoother or evaluator pass
//! actually needs: upload the mesh, bind it, barrier, dispatch. No
//! per-algorithm compute kernel ships in this build — see the module doc
//! on `crate::smoother` for why — so [`Implementation::Glsl`] and
//! [`Implementation::Cuda`] raise [`crate::error::Error::ImplementationMissing`]
//! until a concrete [`GpuBackend`] is registered.

#[cfg(feature = "gpu")]
pub mod resource_pool;

use crate::error::Result;
use crate::mesh::element::POLYHEDRON_KINDS;

/// Compute workgroup size used by the (future) per-algorithm WGSL kernels;
/// every dispatch is sized in multiples of this.
pub const WORKGROUP_SIZE: u32 = 256;

/// Largest quality value representable in the fixed-point histogram buffer
/// a compute kernel would accumulate into, given `WORKGROUP_SIZE` lanes
/// each touching up to `POLYHEDRON_KINDS` element shapes per invocation.
pub const MAX_QUALITY: u32 = u32::MAX / (WORKGROUP_SIZE * POLYHEDRON_KINDS as u32);

/// Opaque handle to geometry uploaded to the device via
/// [`GpuBackend::upload_geometry`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GeometryHandle(pub u64);

/// Opaque handle to a bind group produced by [`GpuBackend::bind_buffers`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BindingHandle(pub u64);

/// The upload / bind / barrier / dispatch contract a GPU-backed smoother or
/// evaluator pass drives. Mirrors the four-call shape the teacher's
/// resource pool already organizes wgpu command encoding around
/// (`resource_pool.rs`'s staging ring and command-encoder helpers), lifted
/// to the granularity a mesh pass needs rather than a per-frame renderer.
pub trait GpuBackend {
    /// Upload vertex positions (and, if present, the per-vertex metric
    /// tensor) as a flat `f32` buffer. Returns a handle for later binds.
    fn upload_geometry(&mut self, positions: &[f32]) -> Result<GeometryHandle>;

    /// Bind previously uploaded buffers to the slots a compute kernel
    /// expects (positions, element connectivity, output histogram, ...).
    fn bind_buffers(&mut self, geometry: GeometryHandle) -> Result<BindingHandle>;

    /// Insert a memory barrier between a write-heavy dispatch (e.g. vertex
    /// relocation) and a read-heavy one (e.g. quality evaluation) so the
    /// second sees the first's results.
    fn memory_barrier(&mut self) -> Result<()>;

    /// Dispatch `workgroup_count` workgroups of `WORKGROUP_SIZE` lanes each
    /// against the bound buffers.
    fn dispatch_compute(&mut self, binding: BindingHandle, workgroup_count: u32) -> Result<()>;
}

#[cfg(feature = "gpu")]
pub use wgpu_backend::WgpuComputeBackend;

#[cfg(feature = "gpu")]
mod wgpu_backend {
    use std::sync::atomic::{AtomicU64, Ordering};

    use wgpu::util::DeviceExt;
    use wgpu::{Buffer, BufferUsages, Device, Queue};

    use super::{BindingHandle, GeometryHandle, GpuBackend};
    use crate::error::{Error, Result};

    /// A minimal wgpu-backed [`GpuBackend`]: one uploaded geometry buffer,
    /// rebound on every call. A real per-algorithm kernel would keep a
    /// pipeline/bind-group cache keyed by shape, the way
    /// `resource_pool::BufferPool` caches by size class; this backend
    /// exists to prove the upload/bind/barrier/dispatch contract wires up
    /// to a real device, not to run a specific smoother.
    pub struct WgpuComputeBackend {
        device: Device,
        queue: Queue,
        next_id: AtomicU64,
        geometry: Option<(GeometryHandle, Buffer)>,
    }

    impl WgpuComputeBackend {
        pub fn new(device: Device, queue: Queue) -> Self {
            Self { device, queue, next_id: AtomicU64::new(0), geometry: None }
        }

        fn alloc_id(&self) -> u64 {
            self.next_id.fetch_add(1, Ordering::Relaxed)
        }
    }

    impl GpuBackend for WgpuComputeBackend {
        fn upload_geometry(&mut self, positions: &[f32]) -> Result<GeometryHandle> {
            let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("meshopt-geometry"),
                contents: bytemuck::cast_slice(positions),
                usage: BufferUsages::STORAGE | BufferUsages::COPY_DST | BufferUsages::COPY_SRC,
            });
            let handle = GeometryHandle(self.alloc_id());
            self.geometry = Some((handle, buffer));
            Ok(handle)
        }

        fn bind_buffers(&mut self, geometry: GeometryHandle) -> Result<BindingHandle> {
            match &self.geometry {
                Some((h, _)) if *h == geometry => Ok(BindingHandle(self.alloc_id())),
                _ => Err(Error::custom("bind_buffers: unknown geometry handle")),
            }
        }

        fn memory_barrier(&mut self) -> Result<()> {
            // wgpu inserts barriers automatically between passes encoded on
            // the same encoder; nothing to do explicitly here, but the call
            // exists so callers don't need to know that.
            Ok(())
        }

        fn dispatch_compute(&mut self, _binding: BindingHandle, _workgroup_count: u32) -> Result<()> {
            Err(Error::ImplementationMissing { name: "gpu-compute-kernel" })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_quality_stays_comfortably_below_u32_max() {
        assert!(MAX_QUALITY > 0);
        assert!((MAX_QUALITY as u64) * (WORKGROUP_SIZE as u64) * (POLYHEDRON_KINDS as u64) <= u32::MAX as u64);
    }
}
