use rich_markup::{
    BackgroundKind, BulletKind, Color, Drawables, Line, RenderConfig, Segment, Token, TokenKind,
};
use serde::{Deserialize, Serialize};

/// Point in render-target pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in render-target pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Half-open containment test.
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Same rectangle moved by `dx`.
    pub fn shifted(&self, dx: f32) -> Self {
        Self {
            x: self.x + dx,
            ..*self
        }
    }

    fn from_bounds(bounds: rich_markup::BoundingBox, origin: Point) -> Self {
        Self::new(
            bounds.x + origin.x,
            bounds.y + origin.y,
            bounds.width,
            bounds.height,
        )
    }
}

/// Text run draw command. `y` is the top of the run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextCommand {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub text: String,
    /// Font handle from the configured font resolver.
    pub font: u32,
    pub size: f32,
    /// Packed RGBA.
    pub color: u32,
    #[serde(default)]
    pub underline: bool,
    #[serde(default)]
    pub strikethrough: bool,
    #[serde(default)]
    pub blink: bool,
}

/// Filled rectangle draw command.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RectCommand {
    pub rect: Rect,
    /// Packed RGBA.
    pub fill: u32,
}

/// Straight line draw command.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RuleCommand {
    pub from: Point,
    pub to: Point,
    pub thickness: f32,
    /// Packed RGBA.
    pub color: u32,
}

/// Bullet shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BulletShape {
    Disc,
    Circle,
    Square,
    Triangle,
    /// Delegated to [`crate::DrawBackend::draw_custom_bullet`].
    Custom,
}

/// List bullet draw command.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BulletCommand {
    /// Square the bullet is inscribed in.
    pub rect: Rect,
    pub shape: BulletShape,
    /// List nesting depth, `1` for the outermost list.
    pub depth: u8,
    /// Packed RGBA.
    pub color: u32,
    #[serde(default)]
    pub blink: bool,
}

/// Progress gauge draw command.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeterCommand {
    pub rect: Rect,
    /// Filled share in `0.0..=1.0`.
    pub fraction: f32,
    /// Packed RGBA.
    pub background: u32,
    /// Packed RGBA.
    pub foreground: u32,
}

/// Start of a scrolling marquee line.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarqueeCommand {
    /// Visible window; content is clipped to it.
    pub clip: Rect,
    /// Width of the scrolling content.
    pub content_width: f32,
}

/// Backend-agnostic draw command.
///
/// Commands carry no time-dependent state. Blink visibility and marquee
/// scrolling are applied when commands are executed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum DrawCommand {
    Text(TextCommand),
    Rect(RectCommand),
    Rule(RuleCommand),
    Bullet(BulletCommand),
    Meter(MeterCommand),
    PushClip(Rect),
    PopClip,
    /// Commands up to the matching `MarqueeEnd` scroll horizontally.
    MarqueeBegin(MarqueeCommand),
    MarqueeEnd,
}

/// Tooltip or link area.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HitRegion {
    pub rect: Rect,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// Owned, serializable result of one layout.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandList {
    pub commands: Vec<DrawCommand>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hit_regions: Vec<HitRegion>,
    /// Laid-out width.
    pub width: f32,
    /// Laid-out height.
    pub height: f32,
    /// `false` when the parse stopped at a fatal error.
    pub complete: bool,
}

impl CommandList {
    /// Convert laid-out drawables into commands translated by `origin`.
    pub fn from_drawables(drawables: &Drawables<'_>, config: &RenderConfig, origin: Point) -> Self {
        let mut builder = CommandBuilder {
            config,
            origin,
            out: Self {
                commands: Vec::with_capacity(drawables.lines.len() * 2),
                hit_regions: Vec::with_capacity(0),
                width: drawables.size.width,
                height: drawables.size.height,
                complete: true,
            },
        };

        for shape in &drawables.backgrounds {
            let fill = match shape.kind {
                BackgroundKind::BlockquoteFill => shape.color,
                BackgroundKind::BlockquoteBar => config.blockquote_bar_color,
            };
            builder.rect(Rect::from_bounds(shape.bounds, origin), fill);
        }
        for line in &drawables.lines {
            builder.line(line);
        }
        builder.out
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Number of text runs.
    pub fn text_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|cmd| matches!(cmd, DrawCommand::Text(_)))
            .count()
    }

    /// Tooltip/link region under a point.
    pub fn hit_test(&self, x: f32, y: f32) -> Option<&HitRegion> {
        self.hit_regions.iter().find(|r| r.rect.contains(x, y))
    }

    /// Compact JSON export.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Indented JSON export for previews and debugging.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

struct CommandBuilder<'c> {
    config: &'c RenderConfig,
    origin: Point,
    out: CommandList,
}

impl CommandBuilder<'_> {
    fn push(&mut self, command: DrawCommand) {
        self.out.commands.push(command);
    }

    fn rect(&mut self, rect: Rect, fill: Color) {
        if fill.is_transparent() || rect.width <= 0.0 || rect.height <= 0.0 {
            return;
        }
        self.push(DrawCommand::Rect(RectCommand {
            rect,
            fill: fill.to_rgba_u32(),
        }));
    }

    fn line(&mut self, line: &Line<'_>) {
        if line.marquee {
            let clip = Rect::new(
                self.origin.x + line.offset.left,
                self.origin.y + line.content.y,
                (self.out.width - line.offset.left - line.offset.right).max(0.0),
                line.content.height,
            );
            self.push(DrawCommand::MarqueeBegin(MarqueeCommand {
                clip,
                content_width: line.content.width,
            }));
        }
        for segment in &line.segments {
            self.segment(segment);
        }
        if line.marquee {
            self.push(DrawCommand::MarqueeEnd);
        }
    }

    fn segment(&mut self, segment: &Segment<'_>) {
        let style = segment.style;
        let bounds = Rect::from_bounds(segment.bounds, self.origin);
        self.rect(bounds, style.bg);
        if style.tooltip.is_some() || style.link.is_some() {
            self.out.hit_regions.push(HitRegion {
                rect: bounds,
                tooltip: style.tooltip.map(str::to_string),
                link: style.link.map(str::to_string),
            });
        }
        for token in &segment.tokens {
            self.token(segment, token);
        }
    }

    fn token(&mut self, segment: &Segment<'_>, token: &Token<'_>) {
        let style = segment.style;
        let rect = Rect::from_bounds(token.bounds, self.origin);
        match token.kind {
            TokenKind::Text | TokenKind::ListItemNumbered => {
                let text = token.display_text();
                if text.is_empty() {
                    return;
                }
                self.push(DrawCommand::Text(TextCommand {
                    x: rect.x,
                    y: rect.y,
                    width: rect.width,
                    height: rect.height,
                    text: text.to_string(),
                    font: style.font.handle.0,
                    size: style.font.size,
                    color: style.fg.to_rgba_u32(),
                    underline: style.decoration.underline,
                    strikethrough: style.decoration.strikethrough,
                    blink: style.blink,
                }));
            }
            TokenKind::HorizontalRule => {
                let y = rect.y + rect.height / 2.0;
                self.push(DrawCommand::Rule(RuleCommand {
                    from: Point::new(rect.x, y),
                    to: Point::new(rect.right(), y),
                    thickness: self.config.hr_thickness,
                    color: style.fg.to_rgba_u32(),
                }));
            }
            TokenKind::ListItemBullet => {
                let shape = match style.list_style {
                    BulletKind::Circle => BulletShape::Circle,
                    BulletKind::Square => BulletShape::Square,
                    BulletKind::Triangle => BulletShape::Triangle,
                    BulletKind::Custom => BulletShape::Custom,
                    BulletKind::Disc | BulletKind::Decimal | BulletKind::None => BulletShape::Disc,
                };
                let side = rect.width.min(rect.height);
                let square = Rect::new(rect.x, rect.y + (rect.height - side) / 2.0, side, side);
                self.push(DrawCommand::Bullet(BulletCommand {
                    rect: square,
                    shape,
                    depth: token.list.as_ref().map_or(1, |m| m.depth),
                    color: style.fg.to_rgba_u32(),
                    blink: style.blink,
                }));
            }
            TokenKind::Meter => {
                self.push(DrawCommand::Meter(MeterCommand {
                    rect,
                    fraction: style.gauge.fraction(),
                    background: self.config.meter_bg_color.to_rgba_u32(),
                    foreground: self.config.meter_fg_color.to_rgba_u32(),
                }));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rich_markup::{layout, Size};

    fn commands(markup: &str) -> CommandList {
        let config = RenderConfig::default();
        let outcome = layout(markup, &config, Size::new(400.0, 0.0));
        CommandList::from_drawables(&outcome.drawables, &config, Point::new(10.0, 20.0))
    }

    #[test]
    fn text_runs_are_translated_by_origin() {
        let list = commands("<b>Hi</b> there");
        let texts: Vec<&TextCommand> = list
            .commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Text(t) => Some(t),
                _ => None,
            })
            .collect();
        assert_eq!(texts.len(), 2);
        assert_eq!(texts[0].text, "Hi");
        assert_eq!(texts[0].x, 10.0);
        assert_eq!(texts[0].y, 20.0);
        assert!(texts[1].x > texts[0].x);
    }

    #[test]
    fn rule_bullet_and_meter_commands() {
        let list = commands("<ul><li>a</li></ul><hr><meter value=\"0.25\">");
        assert!(list
            .commands
            .iter()
            .any(|c| matches!(c, DrawCommand::Bullet(b) if b.shape == BulletShape::Disc)));
        assert!(list
            .commands
            .iter()
            .any(|c| matches!(c, DrawCommand::Rule(r) if r.to.x > r.from.x)));
        let meter = list.commands.iter().find_map(|c| match c {
            DrawCommand::Meter(m) => Some(*m),
            _ => None,
        });
        assert_eq!(meter.map(|m| m.fraction), Some(0.25));
    }

    #[test]
    fn marquee_lines_are_bracketed() {
        let list = commands("<marquee>scroll</marquee>");
        assert!(matches!(list.commands.first(), Some(DrawCommand::MarqueeBegin(_))));
        assert!(matches!(list.commands.last(), Some(DrawCommand::MarqueeEnd)));
    }

    #[test]
    fn hit_regions_cover_links_and_tooltips() {
        let list = commands("<a href=\"https://example.com\">go</a> <abbr title=\"Hyper\">H</abbr>");
        assert_eq!(list.hit_regions.len(), 2);
        let link = &list.hit_regions[0];
        let hit = list.hit_test(link.rect.x + 1.0, link.rect.y + 1.0);
        assert_eq!(hit.and_then(|r| r.link.as_deref()), Some("https://example.com"));
        assert_eq!(list.hit_regions[1].tooltip.as_deref(), Some("Hyper"));
        assert!(list.hit_test(-5.0, -5.0).is_none());
    }

    #[test]
    fn json_export_parses_back() {
        let list = commands("<p>one</p><hr>");
        let json = list.to_json().unwrap();
        assert!(json.contains("\"Text\""));
        let parsed = CommandList::from_json(&json).unwrap();
        assert_eq!(parsed, list);
    }
}
