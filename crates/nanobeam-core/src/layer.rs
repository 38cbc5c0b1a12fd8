use serde::{Deserialize, Serialize};

/// A unique layer identifier (the GDS layer number).
pub type LayerId = u32;

/// Electrode metal.
pub const VANADIUM: LayerId = 1;
/// Pads, buses and routing metal.
pub const GOLD: LayerId = 2;
/// Regions where the GaAs membrane is etched away.
pub const REMOVED_GAAS: LayerId = 3;
/// The unetched nanobeam itself.
pub const CRYSTAL_BLANK: LayerId = 8;

/// Represents a process layer in the layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layer {
    pub id: LayerId,
    pub name: String,
    pub gds_layer: u16,
    pub gds_datatype: u16,
    pub color: LayerColor,
    pub fill_pattern: FillPattern,
    pub opacity: f32,
    pub description: String,
}

impl Layer {
    pub fn new(id: LayerId, name: &str, gds_layer: u16, gds_datatype: u16) -> Self {
        Self {
            id,
            name: name.to_string(),
            gds_layer,
            gds_datatype,
            color: LayerColor::default(),
            fill_pattern: FillPattern::Solid,
            opacity: 0.7,
            description: String::new(),
        }
    }

    pub fn with_color(mut self, r: u8, g: u8, b: u8) -> Self {
        self.color = LayerColor { r, g, b };
        self
    }

    pub fn with_pattern(mut self, pattern: FillPattern) -> Self {
        self.fill_pattern = pattern;
        self
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn with_description(mut self, desc: &str) -> Self {
        self.description = desc.to_string();
        self
    }
}

/// RGB color for a layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayerColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Default for LayerColor {
    fn default() -> Self {
        Self {
            r: 128,
            g: 128,
            b: 128,
        }
    }
}

impl LayerColor {
    /// `#rrggbb` form for SVG and CSS.
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Fill pattern for layer rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FillPattern {
    Solid,
    Hatched,
    Outline,
}

/// A collection of layers representing a process stack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerStack {
    layers: Vec<Layer>,
}

impl LayerStack {
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    /// The GaAs nanobeam process: electrodes, gold, membrane etch and beam blank.
    pub fn nanobeam() -> Self {
        let mut stack = Self::new();
        stack.add_layer(
            Layer::new(VANADIUM, "vanadium", VANADIUM as u16, 0)
                .with_color(70, 110, 200)
                .with_description("Electrode metal"),
        );
        stack.add_layer(
            Layer::new(GOLD, "gold", GOLD as u16, 0)
                .with_color(230, 180, 40)
                .with_opacity(0.6)
                .with_description("Pads and routing"),
        );
        stack.add_layer(
            Layer::new(REMOVED_GAAS, "removed_gaas", REMOVED_GAAS as u16, 0)
                .with_color(200, 60, 60)
                .with_pattern(FillPattern::Hatched)
                .with_description("Membrane etch"),
        );
        stack.add_layer(
            Layer::new(CRYSTAL_BLANK, "crystal_blank", CRYSTAL_BLANK as u16, 0)
                .with_color(60, 160, 90)
                .with_opacity(0.8)
                .with_description("Photonic crystal beam"),
        );
        stack
    }

    pub fn add_layer(&mut self, layer: Layer) {
        self.layers.push(layer);
    }

    pub fn get_layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn get_layer_by_gds(&self, gds_layer: u16, gds_datatype: u16) -> Option<&Layer> {
        self.layers
            .iter()
            .find(|l| l.gds_layer == gds_layer && l.gds_datatype == gds_datatype)
    }

    /// GDS (layer, datatype) for a layer id; unknown ids map straight through.
    pub fn gds_spec(&self, id: LayerId) -> (u16, u16) {
        self.get_layer(id)
            .map(|l| (l.gds_layer, l.gds_datatype))
            .unwrap_or((id as u16, 0))
    }

    pub fn all_layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }
}

impl Default for LayerStack {
    fn default() -> Self {
        Self::new()
    }
}
