// ============================================================================
// hud.rs - wavetank
// HUD text overlay via glyphon: session status on the first line, key
// help below, with an extended block on demand.
// ============================================================================

use glyphon::{
    Attrs, Buffer as TextBuffer, Cache as GlyphCache, Color as GlyphColor, Family, FontSystem,
    Metrics, Resolution, Shaping, SwashCache, TextArea, TextAtlas, TextBounds, TextRenderer,
    Viewport as GlyphViewport,
};

/// Everything the HUD prints about the current frame.
pub struct HudStatus<'a> {
    pub sim_label: &'a str,
    pub width: u32,
    pub height: u32,
    pub field_name: &'a str,
    pub fps: f32,
    /// Simulation step the last frame took.
    pub dt: f32,
    pub max_dt: f32,
    /// The frame being drawn was clamped to the step cap.
    pub behind: bool,
    pub overrun_episodes: u32,
    pub overrun_frames: u64,
    pub paused: bool,
    pub frame: u64,
    pub extended: bool,
}

/// All glyphon resources needed for HUD text rendering.
pub struct HudRenderer {
    font_system: FontSystem,
    swash_cache: SwashCache,
    glyph_viewport: GlyphViewport,
    text_atlas: TextAtlas,
    text_renderer: TextRenderer,
}

impl HudRenderer {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface_format: wgpu::TextureFormat,
    ) -> Self {
        let mut font_system = FontSystem::new();
        let swash_cache = SwashCache::new();
        let glyph_cache = GlyphCache::new(device);
        let glyph_viewport = GlyphViewport::new(device, &glyph_cache);
        let mut text_atlas = TextAtlas::new(device, queue, &glyph_cache, surface_format);
        let text_renderer =
            TextRenderer::new(&mut text_atlas, device, wgpu::MultisampleState::default(), None);

        // Prime the font system so the first frame renders correctly.
        let mut primer = TextBuffer::new(&mut font_system, Metrics::new(16.0, 20.0));
        primer.set_text(
            &mut font_system,
            "wavetank",
            Attrs::new().family(Family::Monospace),
            Shaping::Basic,
        );

        Self {
            font_system,
            swash_cache,
            glyph_viewport,
            text_atlas,
            text_renderer,
        }
    }

    /// Lay out and stage the HUD text for the current frame.
    pub fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        status: &HudStatus<'_>,
        win_w: u32,
        win_h: u32,
    ) {
        self.glyph_viewport.update(
            queue,
            Resolution {
                width: win_w,
                height: win_h,
            },
        );

        let hud_text = build_hud_text(status);

        let mut text_buf = TextBuffer::new(&mut self.font_system, Metrics::new(14.0, 18.0));
        text_buf.set_size(&mut self.font_system, Some(win_w as f32), Some(win_h as f32));
        text_buf.set_text(
            &mut self.font_system,
            &hud_text,
            Attrs::new().family(Family::Monospace),
            Shaping::Basic,
        );
        text_buf.shape_until_scroll(&mut self.font_system, false);

        self.text_renderer
            .prepare(
                device,
                queue,
                &mut self.font_system,
                &mut self.text_atlas,
                &self.glyph_viewport,
                [TextArea {
                    buffer: &text_buf,
                    left: 10.0,
                    top: 10.0,
                    scale: 1.0,
                    bounds: TextBounds {
                        left: 0,
                        top: 0,
                        right: win_w as i32,
                        bottom: win_h as i32,
                    },
                    default_color: GlyphColor::rgb(20, 20, 30),
                    custom_glyphs: &[],
                }],
                &mut self.swash_cache,
            )
            .unwrap();
    }

    /// Draw the staged HUD into an active render pass.
    pub fn render<'a>(&'a self, pass: &mut wgpu::RenderPass<'a>) {
        self.text_renderer
            .render(&self.text_atlas, &self.glyph_viewport, pass)
            .unwrap();
    }

    /// Trim the glyph atlas after presenting.
    pub fn trim(&mut self) {
        self.text_atlas.trim();
    }
}

// ======================== HUD Text Builder ========================

fn build_hud_text(status: &HudStatus<'_>) -> String {
    let pause_status = if status.paused { " [PAUSED]" } else { "" };
    let behind_status = if status.behind { " [behind]" } else { "" };

    if status.extended {
        format!(
            "{} {}x{}  |  field: {}  |  {:.0} fps{}{}\n\
             frame {}  |  dt {:.4} (cap {:.4})  |  overruns: {} episodes, {} frames\n\
             \n\
             c      cycle displayed field\n\
             click  reseed at the pointer\n\
             space  pause / resume\n\
             p      save the displayed field as PNG\n\
             h      hide this help\n\
             esc    quit",
            status.sim_label,
            status.width,
            status.height,
            status.field_name,
            status.fps,
            behind_status,
            pause_status,
            status.frame,
            status.dt,
            status.max_dt,
            status.overrun_episodes,
            status.overrun_frames,
        )
    } else {
        format!(
            "{} {}x{}  |  field: {} (c)  |  {:.0} fps{}{}  |  h: help",
            status.sim_label,
            status.width,
            status.height,
            status.field_name,
            status.fps,
            behind_status,
            pause_status,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(extended: bool) -> HudStatus<'static> {
        HudStatus {
            sim_label: "shallow water",
            width: 70,
            height: 70,
            field_name: "etau",
            fps: 60.4,
            dt: 0.0051,
            max_dt: 1.0 / 70.0,
            behind: false,
            overrun_episodes: 2,
            overrun_frames: 17,
            paused: true,
            frame: 1234,
            extended,
        }
    }

    #[test]
    fn compact_hud_is_a_single_line() {
        let text = build_hud_text(&status(false));
        assert_eq!(text.lines().count(), 1);
        assert!(text.contains("shallow water 70x70"));
        assert!(text.contains("etau"));
        assert!(text.contains("[PAUSED]"));
        assert!(!text.contains("[behind]"));
    }

    #[test]
    fn clamped_frames_are_flagged_inline() {
        let mut flagged = status(false);
        flagged.behind = true;
        flagged.paused = false;
        let text = build_hud_text(&flagged);
        assert!(text.contains("[behind]"));
        assert!(!text.contains("[PAUSED]"));
    }

    #[test]
    fn extended_hud_lists_every_binding() {
        let text = build_hud_text(&status(true));
        assert!(text.contains("overruns: 2 episodes, 17 frames"));
        for key in ["c  ", "click", "space", "p  ", "h  ", "esc"] {
            assert!(text.contains(key), "missing help entry for {:?}", key);
        }
    }
}
