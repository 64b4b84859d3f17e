use crate::error::{FramixError, FramixResult};

/// Fixed canvas extent for every strategy except `add picture frame`, which
/// sizes to the frame asset's native dimensions.
pub const CANVAS_SIZE: u32 = 1024;

/// Top-level request discriminator. Closed set; unknown wire strings are
/// rejected with [`FramixError::UnsupportedAction`], never coerced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Action {
    #[serde(rename = "change background")]
    ChangeBackground,
    #[serde(rename = "add picture frame")]
    AddPictureFrame,
    #[serde(rename = "add border")]
    AddBorder,
    #[serde(rename = "add shaped frame")]
    AddShapedFrame,
    #[serde(rename = "generate transparent shape")]
    GenerateTransparentShape,
    #[serde(rename = "generate shaped image")]
    GenerateShapedImage,
    #[serde(rename = "text frame")]
    TextFrame,
    #[serde(rename = "image variation")]
    ImageVariation,
    #[serde(rename = "generate background")]
    GenerateBackground,
    #[serde(rename = "3D image panel")]
    ImagePanel3d,
}

impl Action {
    pub fn parse(s: &str) -> FramixResult<Self> {
        match s {
            "change background" => Ok(Self::ChangeBackground),
            "add picture frame" => Ok(Self::AddPictureFrame),
            "add border" => Ok(Self::AddBorder),
            "add shaped frame" => Ok(Self::AddShapedFrame),
            "generate transparent shape" => Ok(Self::GenerateTransparentShape),
            "generate shaped image" => Ok(Self::GenerateShapedImage),
            "text frame" => Ok(Self::TextFrame),
            "image variation" => Ok(Self::ImageVariation),
            "generate background" => Ok(Self::GenerateBackground),
            "3D image panel" => Ok(Self::ImagePanel3d),
            other => Err(FramixError::unsupported_action(other.to_string())),
        }
    }

    /// Wire form used by the generation service.
    pub fn wire_name(self) -> &'static str {
        match self {
            Self::ChangeBackground => "change background",
            Self::AddPictureFrame => "add picture frame",
            Self::AddBorder => "add border",
            Self::AddShapedFrame => "add shaped frame",
            Self::GenerateTransparentShape => "generate transparent shape",
            Self::GenerateShapedImage => "generate shaped image",
            Self::TextFrame => "text frame",
            Self::ImageVariation => "image variation",
            Self::GenerateBackground => "generate background",
            Self::ImagePanel3d => "3D image panel",
        }
    }

    /// Actions that composite a caller-selected image.
    pub fn requires_selected_image(self) -> bool {
        matches!(
            self,
            Self::ChangeBackground
                | Self::AddPictureFrame
                | Self::AddBorder
                | Self::AddShapedFrame
                | Self::ImageVariation
        )
    }

    pub fn requires_shape(self) -> bool {
        matches!(
            self,
            Self::AddShapedFrame | Self::GenerateTransparentShape | Self::GenerateShapedImage
        )
    }

    pub fn requires_text(self) -> bool {
        matches!(self, Self::TextFrame)
    }
}

/// Identifier for a catalog shape path. Unknown wire strings degrade to an
/// empty mask path at the catalog layer, matching host behavior.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeId {
    Heart,
    Circle,
    Triangle,
    Cross,
    Star,
    Pentagon,
    Octagon,
    Decaton,
    Rhombus,
}

impl ShapeId {
    pub const ALL: [ShapeId; 9] = [
        Self::Heart,
        Self::Circle,
        Self::Triangle,
        Self::Cross,
        Self::Star,
        Self::Pentagon,
        Self::Octagon,
        Self::Decaton,
        Self::Rhombus,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "heart" => Some(Self::Heart),
            "circle" => Some(Self::Circle),
            "triangle" => Some(Self::Triangle),
            "cross" => Some(Self::Cross),
            "star" => Some(Self::Star),
            "pentagon" => Some(Self::Pentagon),
            "octagon" => Some(Self::Octagon),
            "decaton" => Some(Self::Decaton),
            "rhombus" => Some(Self::Rhombus),
            _ => None,
        }
    }
}

/// One of the six text-rendering strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TextEffect {
    #[serde(rename = "noBorder")]
    NoBorder,
    #[serde(rename = "borderFlag")]
    Border,
    #[serde(rename = "dddFlag1")]
    Bevel3dV1,
    #[serde(rename = "dddFlag2")]
    Bevel3dV2,
    #[serde(rename = "haloFlag")]
    Halo,
    #[serde(rename = "transparentFlag")]
    TransparentLetters,
}

impl TextEffect {
    /// Unknown effect ids fall back to the default `noBorder` recipe.
    pub fn parse_or_default(s: &str) -> Self {
        match s {
            "noBorder" => Self::NoBorder,
            "borderFlag" => Self::Border,
            "dddFlag1" => Self::Bevel3dV1,
            "dddFlag2" => Self::Bevel3dV2,
            "haloFlag" => Self::Halo,
            "transparentFlag" => Self::TransparentLetters,
            other => {
                tracing::warn!(effect = other, "unknown text effect, using noBorder");
                Self::NoBorder
            }
        }
    }
}

/// Supported font families, by host-visible name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum FontFamily {
    #[serde(rename = "Arial")]
    Arial,
    #[serde(rename = "Helvetica")]
    Helvetica,
    #[serde(rename = "Times New Roman")]
    TimesNewRoman,
    #[serde(rename = "Courier New")]
    CourierNew,
    #[serde(rename = "Verdana")]
    Verdana,
    #[serde(rename = "Georgia")]
    Georgia,
    #[serde(rename = "Palatino")]
    Palatino,
    #[serde(rename = "Garamond")]
    Garamond,
    #[serde(rename = "Comic Sans MS")]
    ComicSansMs,
    #[serde(rename = "Trebuchet MS")]
    TrebuchetMs,
    #[serde(rename = "Arial Black")]
    ArialBlack,
    #[serde(rename = "Impact")]
    Impact,
}

impl FontFamily {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Arial" => Some(Self::Arial),
            "Helvetica" => Some(Self::Helvetica),
            "Times New Roman" => Some(Self::TimesNewRoman),
            "Courier New" => Some(Self::CourierNew),
            "Verdana" => Some(Self::Verdana),
            "Georgia" => Some(Self::Georgia),
            "Palatino" => Some(Self::Palatino),
            "Garamond" => Some(Self::Garamond),
            "Comic Sans MS" => Some(Self::ComicSansMs),
            "Trebuchet MS" => Some(Self::TrebuchetMs),
            "Arial Black" => Some(Self::ArialBlack),
            "Impact" => Some(Self::Impact),
            _ => None,
        }
    }
}

/// Straight (non-premultiplied) RGB color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse a `#rrggbb` hex color as the host sends it.
    pub fn parse_hex(s: &str) -> FramixResult<Self> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(FramixError::invalid_parameter(format!(
                "border color must be #rrggbb, got '{s}'"
            )));
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).unwrap_or(0);
        Ok(Self::new(channel(0), channel(2), channel(4)))
    }
}

/// Line-split, font/spacing-parametrized text payload for a text effect.
#[derive(Clone, Debug)]
pub struct TextBlock {
    pub lines: Vec<String>,
    pub family: FontFamily,
    pub line_spacing: f64,
    pub letter_spacing: f64,
    pub border_color: Rgb,
}

impl TextBlock {
    /// Split on explicit newlines; an empty string yields one empty line.
    pub fn new(
        text: &str,
        family: FontFamily,
        line_spacing: f64,
        letter_spacing: f64,
        border_color: Rgb,
    ) -> Self {
        Self {
            lines: text.split('\n').map(str::to_string).collect(),
            family,
            line_spacing,
            letter_spacing,
            border_color,
        }
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }
}

/// One pipeline invocation. Parameters not relevant to `action` are ignored.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ProcessRequest {
    pub action: Action,
    #[serde(default)]
    pub user_prompt: String,
    #[serde(default)]
    pub selected_image_url: Option<String>,
    #[serde(default)]
    pub shape: Option<String>,
    #[serde(default)]
    pub user_text: Option<String>,
    #[serde(default)]
    pub font_family: Option<String>,
    #[serde(default)]
    pub text_effect: Option<String>,
    #[serde(default)]
    pub letter_spacing: Option<f64>,
    #[serde(default)]
    pub line_spacing: Option<f64>,
    #[serde(default)]
    pub border_color: Option<String>,
}

impl ProcessRequest {
    pub fn new(action: Action, user_prompt: impl Into<String>) -> Self {
        Self {
            action,
            user_prompt: user_prompt.into(),
            selected_image_url: None,
            shape: None,
            user_text: None,
            font_family: None,
            text_effect: None,
            letter_spacing: None,
            line_spacing: None,
            border_color: None,
        }
    }

    /// Host-side validation mirrored here so a malformed request fails safely
    /// instead of rendering garbage.
    pub fn validate(&self) -> FramixResult<()> {
        if self.action.requires_selected_image()
            && self
                .selected_image_url
                .as_deref()
                .is_none_or(|s| s.trim().is_empty())
        {
            return Err(FramixError::invalid_parameter(format!(
                "action '{}' requires a selected image",
                self.action.wire_name()
            )));
        }

        if self.action.requires_shape() && self.shape.as_deref().is_none_or(|s| s.trim().is_empty())
        {
            return Err(FramixError::invalid_parameter(format!(
                "action '{}' requires a shape id",
                self.action.wire_name()
            )));
        }

        if self.action.requires_text() {
            if self
                .user_text
                .as_deref()
                .is_none_or(|s| s.trim().is_empty())
            {
                return Err(FramixError::invalid_parameter(
                    "action 'text frame' requires non-empty text",
                ));
            }
            if let Some(ls) = self.line_spacing
                && (!ls.is_finite() || ls <= 0.0)
            {
                return Err(FramixError::invalid_parameter(
                    "line spacing must be finite and > 0",
                ));
            }
            if let Some(ls) = self.letter_spacing
                && (!ls.is_finite() || ls < 0.0)
            {
                return Err(FramixError::invalid_parameter(
                    "letter spacing must be finite and >= 0",
                ));
            }
        }

        Ok(())
    }

    /// Resolve the text-frame parameters into a [`TextBlock`], applying the
    /// host defaults for omitted fields.
    pub fn text_block(&self) -> FramixResult<TextBlock> {
        let text = self.user_text.as_deref().unwrap_or("");
        let family = match self.font_family.as_deref() {
            None => FontFamily::Arial,
            Some(name) => FontFamily::parse(name).ok_or_else(|| {
                FramixError::invalid_parameter(format!("unsupported font family '{name}'"))
            })?,
        };
        let border_color = match self.border_color.as_deref() {
            None => Rgb::default(),
            Some(hex) => Rgb::parse_hex(hex)?,
        };
        Ok(TextBlock::new(
            text,
            family,
            self.line_spacing.unwrap_or(1.0),
            self.letter_spacing.unwrap_or(0.0),
            border_color,
        ))
    }

    pub fn text_effect(&self) -> TextEffect {
        self.text_effect
            .as_deref()
            .map(TextEffect::parse_or_default)
            .unwrap_or(TextEffect::NoBorder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_parse_roundtrips_wire_names() {
        for name in [
            "change background",
            "add picture frame",
            "add border",
            "add shaped frame",
            "generate transparent shape",
            "generate shaped image",
            "text frame",
            "image variation",
            "generate background",
            "3D image panel",
        ] {
            let action = Action::parse(name).unwrap();
            assert_eq!(action.wire_name(), name);
        }
    }

    #[test]
    fn action_parse_rejects_unknown() {
        let err = Action::parse("make it pop").unwrap_err();
        assert!(matches!(err, FramixError::UnsupportedAction(_)));
    }

    #[test]
    fn action_serde_uses_wire_names() {
        let json = serde_json::to_string(&Action::ImagePanel3d).unwrap();
        assert_eq!(json, "\"3D image panel\"");
        let back: Action = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Action::ImagePanel3d);
    }

    #[test]
    fn shape_parse_covers_catalog_and_rejects_unknown() {
        for id in ShapeId::ALL {
            let name = serde_json::to_string(&id).unwrap();
            let name = name.trim_matches('"').to_string();
            assert_eq!(ShapeId::parse(&name), Some(id));
        }
        assert_eq!(ShapeId::parse("hexagon"), None);
    }

    #[test]
    fn unknown_text_effect_falls_back_to_no_border() {
        assert_eq!(TextEffect::parse_or_default("glitter"), TextEffect::NoBorder);
        assert_eq!(
            TextEffect::parse_or_default("transparentFlag"),
            TextEffect::TransparentLetters
        );
    }

    #[test]
    fn hex_color_parse() {
        assert_eq!(Rgb::parse_hex("#00bf63").unwrap(), Rgb::new(0, 191, 99));
        assert_eq!(Rgb::parse_hex("ff0000").unwrap(), Rgb::new(255, 0, 0));
        assert!(Rgb::parse_hex("#abc").is_err());
        assert!(Rgb::parse_hex("#zzzzzz").is_err());
    }

    #[test]
    fn empty_text_yields_one_empty_line() {
        let block = TextBlock::new("", FontFamily::Arial, 1.0, 0.0, Rgb::default());
        assert_eq!(block.line_count(), 1);
        assert_eq!(block.lines[0], "");
    }

    #[test]
    fn validate_requires_per_action_parameters() {
        let mut req = ProcessRequest::new(Action::AddShapedFrame, "a castle");
        assert!(req.validate().is_err());
        req.selected_image_url = Some("photo.png".to_string());
        assert!(req.validate().is_err());
        req.shape = Some("heart".to_string());
        assert!(req.validate().is_ok());

        let mut req = ProcessRequest::new(Action::TextFrame, "sunset");
        assert!(req.validate().is_err());
        req.user_text = Some("HI".to_string());
        assert!(req.validate().is_ok());
        req.line_spacing = Some(0.0);
        assert!(req.validate().is_err());
    }

    #[test]
    fn request_json_accepts_host_field_names() {
        let req: ProcessRequest = serde_json::from_str(
            r##"{
                "action": "text frame",
                "user_prompt": "alpine lake",
                "user_text": "HELLO\nWORLD",
                "font_family": "Impact",
                "text_effect": "haloFlag",
                "letter_spacing": 12.0,
                "line_spacing": 1.2,
                "border_color": "#102030"
            }"##,
        )
        .unwrap();
        assert_eq!(req.action, Action::TextFrame);
        let block = req.text_block().unwrap();
        assert_eq!(block.family, FontFamily::Impact);
        assert_eq!(block.line_count(), 2);
        assert_eq!(block.border_color, Rgb::new(16, 32, 48));
        assert_eq!(req.text_effect(), TextEffect::Halo);
    }
}
