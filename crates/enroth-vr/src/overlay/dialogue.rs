//! Dialogue text and option menu, rasterised into textures and drawn as
//! head-locked quads below the line of sight.

use glam::{Mat4, Vec2};

use crate::config::{InputConfig, OverlayConfig};
use crate::diag::OneShotLog;
use crate::graphics::{GraphicsApi, TextureId};
use crate::input::{StickStep, StickStepper};
use crate::math::Quad;
use crate::overlay::{head_locked_pose, QuadRenderer};
use crate::text::{wrap_text, PixelBuffer, Rgba, TextRasterizer};
use crate::types::Pose;

const BACKGROUND: Rgba = [10, 10, 16, 200];
const TEXT_COLOR: Rgba = [235, 230, 210, 255];
const OPTION_COLOR: Rgba = [170, 170, 170, 255];
const HIGHLIGHT: Rgba = [70, 90, 160, 230];
/// Vertical gap between the text panel and the menu panel, meters.
const PANEL_GAP: f32 = 0.02;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuEvent {
    Moved(usize),
    Confirmed(usize),
}

/// Selection index over a list of options, stepped by stick deflection.
#[derive(Debug, Clone, Copy)]
pub struct MenuNavigator {
    selected: usize,
    stepper: StickStepper,
}

impl MenuNavigator {
    pub fn new(config: &InputConfig) -> Self {
        Self {
            selected: 0,
            stepper: StickStepper::from(config),
        }
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn reset(&mut self) {
        self.selected = 0;
    }

    /// Applies one frame of input. Stick up moves toward the first option;
    /// the selection clamps at both ends. `confirm` must already be edge-detected.
    pub fn update(&mut self, count: usize, stick_y: f32, confirm: bool) -> Option<MenuEvent> {
        if count == 0 {
            return None;
        }
        self.selected = self.selected.min(count - 1);
        if confirm {
            return Some(MenuEvent::Confirmed(self.selected));
        }
        let next = match self.stepper.update(stick_y)? {
            StickStep::Up => self.selected.saturating_sub(1),
            StickStep::Down => (self.selected + 1).min(count - 1),
        };
        if next == self.selected {
            return None;
        }
        self.selected = next;
        Some(MenuEvent::Moved(next))
    }
}

/// A texture holding one rasterised panel.
#[derive(Debug, Default)]
struct PanelTexture {
    texture: Option<TextureId>,
    width: u32,
    height: u32,
}

impl PanelTexture {
    fn upload<G: GraphicsApi + ?Sized>(&mut self, gfx: &mut G, mut pixels: PixelBuffer) {
        pixels.flip_vertical();
        let (width, height) = (pixels.width(), pixels.height());
        if self.texture.is_some() && (self.width != width || self.height != height) {
            self.release(gfx);
        }
        if self.texture.is_none() {
            self.texture = gfx.create_texture(width, height);
            if self.texture.is_none() {
                log::warn!("dialogue texture {width}x{height} could not be created");
                return;
            }
        }
        if let Some(texture) = self.texture {
            gfx.upload_texture(texture, width, height, pixels.data());
            self.width = width;
            self.height = height;
        }
    }

    fn release<G: GraphicsApi + ?Sized>(&mut self, gfx: &mut G) {
        if let Some(texture) = self.texture.take() {
            gfx.delete_texture(texture);
        }
        self.width = 0;
        self.height = 0;
    }

    fn aspect(&self) -> f32 {
        if self.width == 0 {
            return 0.0;
        }
        self.height as f32 / self.width as f32
    }
}

#[derive(Debug)]
pub struct DialogueOverlay {
    config: OverlayConfig,
    text: String,
    options: Vec<String>,
    text_panel: PanelTexture,
    menu_panel: PanelTexture,
    navigator: MenuNavigator,
    visible: bool,
}

impl DialogueOverlay {
    pub fn new(overlay: &OverlayConfig, input: &InputConfig) -> Self {
        Self {
            config: overlay.clone(),
            text: String::new(),
            options: Vec::new(),
            text_panel: PanelTexture::default(),
            menu_panel: PanelTexture::default(),
            navigator: MenuNavigator::new(input),
            visible: false,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn has_menu(&self) -> bool {
        self.visible && !self.options.is_empty()
    }

    pub fn selected(&self) -> usize {
        self.navigator.selected()
    }

    pub fn text_texture(&self) -> Option<TextureId> {
        self.text_panel.texture
    }

    pub fn menu_texture(&self) -> Option<TextureId> {
        self.menu_panel.texture
    }

    /// Shows `text`, re-rasterising only when it changed.
    pub fn set_text<G, T>(&mut self, gfx: &mut G, fonts: &T, text: &str)
    where
        G: GraphicsApi + ?Sized,
        T: TextRasterizer + ?Sized,
    {
        self.visible = true;
        if self.text == text && self.text_panel.texture.is_some() {
            return;
        }
        self.text = text.to_string();
        let pixels = self.rasterize_text(fonts);
        self.text_panel.upload(gfx, pixels);
    }

    /// Replaces the option list; a new list starts at the first option.
    pub fn set_options<G, T>(&mut self, gfx: &mut G, fonts: &T, options: &[String])
    where
        G: GraphicsApi + ?Sized,
        T: TextRasterizer + ?Sized,
    {
        self.visible = true;
        if self.options == options && self.menu_panel.texture.is_some() {
            return;
        }
        self.options = options.to_vec();
        self.navigator.reset();
        if self.options.is_empty() {
            self.menu_panel.release(gfx);
            return;
        }
        let pixels = self.rasterize_menu(fonts);
        self.menu_panel.upload(gfx, pixels);
    }

    /// Steps or confirms the selection. The menu texture is redrawn when the
    /// highlight moves.
    pub fn update_menu<G, T>(
        &mut self,
        gfx: &mut G,
        fonts: &T,
        stick_y: f32,
        confirm: bool,
    ) -> Option<MenuEvent>
    where
        G: GraphicsApi + ?Sized,
        T: TextRasterizer + ?Sized,
    {
        if !self.has_menu() {
            return None;
        }
        let event = self.navigator.update(self.options.len(), stick_y, confirm);
        if let Some(MenuEvent::Moved(_)) = event {
            let pixels = self.rasterize_menu(fonts);
            self.menu_panel.upload(gfx, pixels);
        }
        event
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }

    /// Draws the text panel with the menu under it, in front of `head`.
    pub fn render<G: GraphicsApi + ?Sized>(
        &self,
        gfx: &mut G,
        renderer: &mut QuadRenderer,
        diagnostics: &mut OneShotLog,
        head: &Pose,
        view_projection: &Mat4,
    ) {
        if !self.visible {
            return;
        }
        let width = self.config.dialogue_width;
        let mut drop = self.config.dialogue_drop;

        for panel in [&self.text_panel, &self.menu_panel] {
            let Some(texture) = panel.texture else {
                continue;
            };
            let size = Vec2::new(width, width * panel.aspect());
            let pose = head_locked_pose(head, self.config.dialogue_distance, drop + size.y * 0.5);
            let quad = Quad::from_pose(&pose, size);
            renderer.draw(gfx, diagnostics, texture, &quad, view_projection, 1.0);
            drop += size.y + PANEL_GAP;
        }
    }

    pub fn destroy<G: GraphicsApi + ?Sized>(&mut self, gfx: &mut G) {
        self.text_panel.release(gfx);
        self.menu_panel.release(gfx);
        self.text.clear();
        self.options.clear();
        self.visible = false;
    }

    fn rasterize_text<T: TextRasterizer + ?Sized>(&self, fonts: &T) -> PixelBuffer {
        let width = self.config.dialogue_texture_width;
        let pad = self.config.dialogue_padding;
        let inner = width.saturating_sub(pad * 2);
        let lines = wrap_text(&self.text, inner, |s| fonts.text_width(s));
        let line_height = fonts.line_height();
        let height = fonts.wrapped_text_height(&self.text, inner) + pad * 2;

        let mut pixels = PixelBuffer::new(width, height.max(1));
        pixels.fill(BACKGROUND);
        for (row, line) in lines.iter().enumerate() {
            let y = pad + row as u32 * line_height;
            fonts.rasterize_line(line, &mut pixels, pad, y, TEXT_COLOR);
        }
        pixels
    }

    fn rasterize_menu<T: TextRasterizer + ?Sized>(&self, fonts: &T) -> PixelBuffer {
        let width = self.config.dialogue_texture_width;
        let pad = self.config.dialogue_padding;
        let row_height = fonts.line_height() + pad;
        let height = row_height * self.options.len() as u32 + pad;

        let mut pixels = PixelBuffer::new(width, height.max(1));
        pixels.fill(BACKGROUND);
        let selected = self.navigator.selected();
        for (i, option) in self.options.iter().enumerate() {
            let top = pad / 2 + i as u32 * row_height;
            let color = if i == selected {
                pixels.fill_rect(0, top, width, row_height, HIGHLIGHT);
                TEXT_COLOR
            } else {
                OPTION_COLOR
            };
            fonts.rasterize_line(option, &mut pixels, pad, top + pad / 2, color);
        }
        pixels
    }
}
