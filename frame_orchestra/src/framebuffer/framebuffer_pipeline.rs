/// Framebuffer pipeline: geometry → post-process → present.
///
/// A fixed ring of `SAVED_FRAMES` geometry framebuffers (kept for temporal
/// effects) and a ping-pong pair that lets any number of post-process stages
/// run without extra allocation:
///
/// ```text
///   bind_geometry        end_geometry          swap        swap       end_frame
///  ┌────────────┐ resolve ┌────────┐      ┌────────┐  ┌────────┐
///  │ geometry[i]│────────▶│ pong[0]│─────▶│ pong[1]│─▶│ pong[0]│──▶ present
///  └────────────┘         └────────┘      └────────┘  └────────┘
/// ```
///
/// Growing the temporal history means changing `SAVED_FRAMES`, not a
/// runtime parameter.
///
/// A device error during a transition abandons the frame: whatever was
/// bound is released, the pipeline goes back to `Idle` and the geometry
/// ring does not rotate, so the next `bind_geometry()` starts over.

use std::sync::Arc;
use winit::dpi::PhysicalSize;
use crate::engine_bail;
use crate::error::{Error, Result};
use crate::graphics_device::{RenderProfile, Texture};
use super::device_context::DeviceContext;
use super::framebuffer::{Framebuffer, FramebufferDesc, FramebufferTargets, TargetSlot};

/// Number of geometry frames kept in the ring
pub const SAVED_FRAMES: usize = 2;

/// Number of post-process buffers
pub const PING_PONG_COUNT: usize = 2;

/// Where the pipeline is within a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Between frames, nothing bound
    Idle,
    /// A geometry buffer is bound for writing
    GeometryBound,
    /// A ping-pong buffer is bound for writing
    PostProcessBound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActiveBuffer {
    Geometry(usize),
    PingPong(usize),
}

pub struct FramebufferPipeline {
    size: PhysicalSize<u32>,
    /// Exactly `SAVED_FRAMES` entries
    geometry_buffers: Vec<Framebuffer>,
    /// Exactly `PING_PONG_COUNT` entries
    ping_pong: Vec<Framebuffer>,
    current_geometry_index: usize,
    current_ping_pong_index: usize,
    active: Option<ActiveBuffer>,
    frames_completed: u64,
}

impl FramebufferPipeline {
    /// Allocate every buffer at `size`
    ///
    /// Geometry buffers carry color + depth at the configured MSAA sample
    /// count; ping-pong buffers are single-sampled color only.
    pub fn new(ctx: &mut DeviceContext, size: PhysicalSize<u32>) -> Result<Self> {
        let (geometry_buffers, ping_pong) = Self::create_buffers(ctx, size)?;

        crate::orchestra_info!(
            "orchestra::FramebufferPipeline",
            "Created {}x{} pipeline ({} geometry, {} ping-pong, {}x MSAA)",
            size.width, size.height, SAVED_FRAMES, PING_PONG_COUNT, ctx.config().msaa_samples
        );

        Ok(Self {
            size,
            geometry_buffers,
            ping_pong,
            current_geometry_index: 0,
            current_ping_pong_index: 0,
            active: None,
            frames_completed: 0,
        })
    }

    fn create_buffers(
        ctx: &mut DeviceContext,
        size: PhysicalSize<u32>,
    ) -> Result<(Vec<Framebuffer>, Vec<Framebuffer>)> {
        let config = ctx.config().clone();

        let mut geometry_buffers = Vec::with_capacity(SAVED_FRAMES);
        for i in 0..SAVED_FRAMES {
            let desc = FramebufferDesc::new(
                &format!("geometry{}", i),
                size.width,
                size.height,
                FramebufferTargets::COLOR0 | FramebufferTargets::DEPTH,
            )
            .with_samples(config.msaa_samples)
            .with_formats(config.color_format, config.depth_format);
            geometry_buffers.push(Framebuffer::new(ctx, desc)?);
        }

        let mut ping_pong = Vec::with_capacity(PING_PONG_COUNT);
        for i in 0..PING_PONG_COUNT {
            let desc = FramebufferDesc::new(
                &format!("pingpong{}", i),
                size.width,
                size.height,
                FramebufferTargets::COLOR0,
            )
            .with_formats(config.color_format, config.depth_format);
            ping_pong.push(Framebuffer::new(ctx, desc)?);
        }

        Ok((geometry_buffers, ping_pong))
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    pub fn state(&self) -> PipelineState {
        match self.active {
            None => PipelineState::Idle,
            Some(ActiveBuffer::Geometry(_)) => PipelineState::GeometryBound,
            Some(ActiveBuffer::PingPong(_)) => PipelineState::PostProcessBound,
        }
    }

    /// Geometry buffer written by the current (or next) frame
    pub fn current_geometry_index(&self) -> usize {
        self.current_geometry_index
    }

    pub fn current_ping_pong_index(&self) -> usize {
        self.current_ping_pong_index
    }

    /// Number of `end_frame()` calls since creation
    pub fn frames_completed(&self) -> u64 {
        self.frames_completed
    }

    /// Buffer currently bound for writing, `None` between frames
    pub fn active_buffer(&self) -> Option<&Framebuffer> {
        self.active.map(|active| self.buffer(active))
    }

    pub fn geometry_buffer(&self, index: usize) -> &Framebuffer {
        &self.geometry_buffers[index]
    }

    pub fn ping_pong_buffer(&self, index: usize) -> &Framebuffer {
        &self.ping_pong[index]
    }

    fn buffer(&self, active: ActiveBuffer) -> &Framebuffer {
        match active {
            ActiveBuffer::Geometry(i) => &self.geometry_buffers[i],
            ActiveBuffer::PingPong(i) => &self.ping_pong[i],
        }
    }

    fn expect_state(&self, expected: PipelineState, operation: &str) -> Result<()> {
        let state = self.state();
        if state != expected {
            engine_bail!("orchestra::FramebufferPipeline", Error::InvalidState(format!(
                "{}() requires {:?}, pipeline is {:?}", operation, expected, state
            )));
        }
        Ok(())
    }

    /// Bind and clear this frame's geometry buffer
    pub fn bind_geometry(&mut self, ctx: &mut DeviceContext) -> Result<()> {
        self.expect_state(PipelineState::Idle, "bind_geometry")?;

        let index = self.current_geometry_index;
        ctx.device_mut().set_render_profile(RenderProfile::Geometry)?;
        self.geometry_buffers[index].bind(ctx)?;
        self.active = Some(ActiveBuffer::Geometry(index));
        self.geometry_buffers[index].clear_targets(ctx)
    }

    /// Hand the geometry image over to the first ping-pong buffer
    ///
    /// Switches to the post-process profile and resolves the (possibly
    /// multisampled) geometry color into the single-sampled ping-pong buffer.
    pub fn end_geometry(&mut self, ctx: &mut DeviceContext) -> Result<()> {
        self.expect_state(PipelineState::GeometryBound, "end_geometry")?;

        ctx.device_mut().set_render_profile(RenderProfile::PostProcess)?;

        let geometry = &self.geometry_buffers[self.current_geometry_index];
        let source = geometry.target_as_texture(TargetSlot::Color0);
        let unbound = geometry.unbind(ctx);
        self.active = None;
        unbound?;

        self.current_ping_pong_index = 0;
        let target = &self.ping_pong[0];
        target.bind(ctx)?;
        self.active = Some(ActiveBuffer::PingPong(0));

        ctx.device_mut()
            .resolve(&source, &target.target_as_texture(TargetSlot::Color0))
    }

    /// Flip ping-pong buffers and return the image just written
    ///
    /// The returned texture is the input of the next post-process stage; the
    /// newly bound buffer is the one two stages back, so it is free to overwrite.
    /// Nothing is cleared.
    pub fn swap(&mut self, ctx: &mut DeviceContext) -> Result<Arc<dyn Texture>> {
        self.expect_state(PipelineState::PostProcessBound, "swap")?;

        let previous = &self.ping_pong[self.current_ping_pong_index];
        let written = previous.target_as_texture(TargetSlot::Color0);
        let unbound = previous.unbind(ctx);
        self.active = None;
        unbound?;

        self.current_ping_pong_index = (self.current_ping_pong_index + 1) % PING_PONG_COUNT;
        self.ping_pong[self.current_ping_pong_index].bind(ctx)?;
        self.active = Some(ActiveBuffer::PingPong(self.current_ping_pong_index));

        crate::orchestra_trace!(
            "orchestra::FramebufferPipeline",
            "swap -> pingpong{}", self.current_ping_pong_index
        );
        Ok(written)
    }

    /// Release the final image for presentation and rotate the geometry ring
    ///
    /// The geometry buffer written this frame stays intact for temporal
    /// effects until it comes around again.
    pub fn end_frame(&mut self, ctx: &mut DeviceContext) -> Result<Arc<dyn Texture>> {
        let Some(active) = self.active else {
            engine_bail!("orchestra::FramebufferPipeline", Error::InvalidState(
                "end_frame() called with no frame in progress".to_string()
            ));
        };

        let buffer = self.buffer(active);
        let final_image = buffer.target_as_texture(TargetSlot::Color0);
        let unbound = buffer.unbind(ctx);
        self.active = None;
        unbound?;

        self.current_geometry_index = (self.current_geometry_index + 1) % SAVED_FRAMES;
        self.frames_completed += 1;
        Ok(final_image)
    }

    /// Most recently completed geometry frame
    pub fn last_frame(&self) -> Arc<dyn Texture> {
        let index = (self.current_geometry_index + SAVED_FRAMES - 1) % SAVED_FRAMES;
        self.geometry_buffers[index].target_as_texture(TargetSlot::Color0)
    }

    /// Geometry frame `n + 1` frames before the most recently completed one
    ///
    /// `n` must be below `SAVED_FRAMES - 1`; with two saved frames only
    /// `previous_frame(0)` exists.
    pub fn previous_frame(&self, n: usize) -> Arc<dyn Texture> {
        assert!(
            n < SAVED_FRAMES - 1,
            "previous_frame({}) exceeds the {} frame(s) of history",
            n,
            SAVED_FRAMES - 1
        );
        let index = (self.current_geometry_index + 2 * SAVED_FRAMES - 2 - n) % SAVED_FRAMES;
        self.geometry_buffers[index].target_as_texture(TargetSlot::Color0)
    }

    /// Recreate every buffer at `size`
    ///
    /// Must be called between frames. History is lost: previous frames read
    /// back as freshly allocated images.
    pub fn resize(&mut self, ctx: &mut DeviceContext, size: PhysicalSize<u32>) -> Result<()> {
        self.expect_state(PipelineState::Idle, "resize")?;
        if size == self.size {
            return Ok(());
        }

        let (geometry_buffers, ping_pong) = Self::create_buffers(ctx, size)?;
        self.geometry_buffers = geometry_buffers;
        self.ping_pong = ping_pong;
        self.size = size;
        self.current_ping_pong_index = 0;

        crate::orchestra_info!(
            "orchestra::FramebufferPipeline",
            "Resized to {}x{}", size.width, size.height
        );
        Ok(())
    }
}

#[cfg(test)]
#[path = "framebuffer_pipeline_tests.rs"]
mod tests;
