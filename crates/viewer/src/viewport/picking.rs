//! Color-coded picking.
//!
//! Every mesh is drawn flat with its id packed into RGB on a black background,
//! one pixel is read back, and the visible frame is redrawn right after.

use glam::Vec3;
use mesh_model::{Mesh, MeshId, MAX_MESH_ID};

use super::gl_renderer::{end_frame, GeometryKind, RenderEngine, RenderParams};
use super::gpu::{DrawMode, Gpu, VertexLayout};
use super::mesh::{build_fill, Shading};

/// Pack the low 24 bits of `id` as RGB in [0, 1]: byte 0 is red.
pub fn encode_pick_color(id: MeshId) -> [f32; 3] {
    [
        (id & 0xFF) as f32 / 255.0,
        ((id >> 8) & 0xFF) as f32 / 255.0,
        ((id >> 16) & 0xFF) as f32 / 255.0,
    ]
}

/// Inverse of [`encode_pick_color`]; black means nothing.
pub fn decode_pick_color(rgb: [u8; 3]) -> Option<MeshId> {
    let id = rgb[0] as MeshId | (rgb[1] as MeshId) << 8 | (rgb[2] as MeshId) << 16;
    (id != 0).then_some(id)
}

/// What a normalized color channel becomes once written to an 8-bit target.
pub fn quantize(c: f32) -> u8 {
    (c.clamp(0.0, 1.0) * 255.0).round() as u8
}

impl<G: Gpu> RenderEngine<G> {
    /// Mesh under pixel (`x`, `y`), top-left origin inside the viewport.
    ///
    /// The visible frame is always redrawn with `params` afterwards, hit or miss.
    pub fn pick_at(&mut self, x: f32, y: f32, meshes: &[Mesh], params: &RenderParams) -> Option<MeshId> {
        if !self.ensure_ready() {
            return None;
        }
        let picked = self.pick_pass(x, y, meshes);
        tracing::debug!("pick at ({x:.0}, {y:.0}) -> {picked:?}");
        self.redraw(meshes, params);
        picked
    }

    fn pick_pass(&mut self, x: f32, y: f32, meshes: &[Mesh]) -> Option<MeshId> {
        let frame = self.frame_transforms(meshes);
        let target = self.begin_target([0.0, 0.0, 0.0, 1.0])?;
        let (Some(gpu), Some(res)) = (self.gpu.as_ref(), self.resources.as_mut()) else {
            return None;
        };

        let program = res.pick_program();
        gpu.use_program(Some(program));
        for m in meshes.iter().filter(|m| !m.is_empty()) {
            if m.id == 0 || m.id > MAX_MESH_ID {
                tracing::warn!("mesh id {} cannot be encoded for picking, skipped", m.id);
                continue;
            }
            let data = build_fill(m, Shading::Flat);
            let Some((vao, count)) = res.upload(gpu, (m.id, GeometryKind::Fill), VertexLayout::FILL, &data.vertices)
            else {
                continue;
            };
            gpu.set_uniform_mat4(program, "u_mvp", &frame.mesh_mvp(m));
            gpu.set_uniform_vec3(program, "u_pick_color", Vec3::from(encode_pick_color(m.id)));
            gpu.draw_arrays(vao, DrawMode::Triangles, count);
        }

        let rect = target.rect;
        let (px, py) = (x.floor() as i32, y.floor() as i32);
        let inside = px >= 0 && py >= 0 && px < rect.width && py < rect.height;
        let picked = if inside {
            // framebuffer rows run bottom-up
            let [r, g, b, _] = gpu.read_pixel(rect.x + px, rect.y + rect.height - 1 - py);
            decode_pick_color([r, g, b])
        } else {
            None
        };

        end_frame(gpu);
        picked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(id: MeshId) -> Option<MeshId> {
        decode_pick_color(encode_pick_color(id).map(quantize))
    }

    #[test]
    fn test_zero_is_nothing() {
        assert_eq!(round_trip(0), None);
        assert_eq!(decode_pick_color([0, 0, 0]), None);
    }

    #[test]
    fn test_round_trip_boundaries() {
        for id in [1, 2, 255, 256, 257, 65_535, 65_536, 0x00AB_CDEF, MAX_MESH_ID - 1, MAX_MESH_ID] {
            assert_eq!(round_trip(id), Some(id));
        }
    }

    #[test]
    fn test_round_trip_sampled_range() {
        let mut id: MeshId = 1;
        while id <= MAX_MESH_ID {
            assert_eq!(round_trip(id), Some(id));
            id += 7_919;
        }
    }

    #[test]
    fn test_byte_order() {
        assert_eq!(encode_pick_color(1), [1.0 / 255.0, 0.0, 0.0]);
        assert_eq!(decode_pick_color([0, 0, 1]), Some(65_536));
    }
}
