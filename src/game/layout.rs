use crate::error::PlayfieldError;
use crate::game::parsing::skin_ini::POSITION_SCALE_FACTOR;
use crate::game::scroll::ScrollDirection;
use crate::game::skin::SkinConfiguration;

/// Judgement line thickness in logical units.
const JUDGEMENT_LINE_THICKNESS: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    #[inline(always)]
    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    #[inline(always)]
    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }
}

/// Pixel sizes of the stage sprites, as the render layer will draw them.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StageSprites {
    pub key_cap_height: f32,
    pub note_height: f32,
    pub stage_left_width: f32,
    pub stage_right_width: f32,
    pub stage_bottom: [f32; 2],
}

impl StageSprites {
    /// Derives drawn sizes from texture dimensions. Key caps and notes keep
    /// their aspect at column width. Unknown textures collapse to zero.
    pub fn from_texture_dims<F>(skin: &SkinConfiguration, screen_height: f32, dims: F) -> Self
    where
        F: Fn(&str) -> Option<(u32, u32)>,
    {
        let fitted_height = |names: &[String]| {
            names
                .first()
                .zip(skin.column_width.first())
                .and_then(|(name, &col_w)| {
                    let (w, h) = dims(name.as_str())?;
                    (w > 0).then(|| h as f32 * col_w / w as f32)
                })
                .unwrap_or(0.0)
        };
        let border_width = |name: &str| {
            dims(name)
                .filter(|&(_, h)| h > 0)
                .map_or(0.0, |(w, h)| w as f32 * screen_height / h as f32)
        };
        let stage_bottom = dims(skin.images.stage_bottom.as_str())
            .filter(|&(w, _)| w > 0)
            .map_or([0.0, 0.0], |(w, h)| {
                let width = skin.total_width();
                [width, h as f32 * width / w as f32]
            });
        Self {
            key_cap_height: fitted_height(&skin.images.keys),
            note_height: fitted_height(&skin.images.notes),
            stage_left_width: border_width(skin.images.stage_left.as_str()),
            stage_right_width: border_width(skin.images.stage_right.as_str()),
            stage_bottom,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JudgementLine {
    pub rect: Rect,
    pub visible: bool,
    pub colour: [f32; 4],
}

pub fn key_cap_rect(
    skin: &SkinConfiguration,
    index: usize,
    screen: [f32; 2],
    direction: ScrollDirection,
    key_cap_height: f32,
) -> Result<Rect, PlayfieldError> {
    let width = skin.column_width_at(index)?;
    let x = (index as f32).mul_add(width, skin.column_start_px(screen[0]));
    let y = match direction {
        ScrollDirection::Down => screen[1] - key_cap_height,
        ScrollDirection::Up => 0.0,
    };
    Ok(Rect::new(x, y, width, key_cap_height))
}

pub fn column_background_rect(
    skin: &SkinConfiguration,
    index: usize,
    screen: [f32; 2],
) -> Result<Rect, PlayfieldError> {
    let width = skin.column_width_at(index)?;
    let x = (index as f32).mul_add(width, skin.column_start_px(screen[0]));
    Ok(Rect::new(x, 0.0, width, screen[1]))
}

/// Left and right stage borders, flush against the column group.
pub fn stage_border_rects(
    skin: &SkinConfiguration,
    screen: [f32; 2],
    sprites: &StageSprites,
) -> (Rect, Rect) {
    let left_edge = skin.column_start_px(screen[0]);
    let right_edge = left_edge + skin.total_width();
    (
        Rect::new(left_edge - sprites.stage_left_width, 0.0, sprites.stage_left_width, screen[1]),
        Rect::new(right_edge, 0.0, sprites.stage_right_width, screen[1]),
    )
}

pub fn stage_bottom_rect(skin: &SkinConfiguration, screen: [f32; 2], sprites: &StageSprites) -> Rect {
    let [w, h] = sprites.stage_bottom;
    let centre = skin.column_start_px(screen[0]) + skin.total_width() * 0.5;
    Rect::new(centre - w * 0.5, screen[1] - h, w, h)
}

/// The line notes meet at their start time. Upscroll mirrors it so the
/// line's bottom edge sits where rising notes' top edges arrive.
pub fn judgement_line(
    skin: &SkinConfiguration,
    screen: [f32; 2],
    direction: ScrollDirection,
) -> JudgementLine {
    let thickness = JUDGEMENT_LINE_THICKNESS * POSITION_SCALE_FACTOR;
    let hit_px = skin.hit_position_px(screen[1]);
    let y = match direction {
        ScrollDirection::Down => hit_px,
        ScrollDirection::Up => screen[1] - hit_px - thickness,
    };
    JudgementLine {
        rect: Rect::new(skin.column_start_px(screen[0]), y, skin.total_width(), thickness),
        visible: skin.judgement_line,
        colour: skin.judgement_line_colour,
    }
}

/// Every static rectangle of the stage for one screen size.
#[derive(Debug, Clone, PartialEq)]
pub struct StageLayout {
    pub key_caps: Vec<Rect>,
    pub column_backgrounds: Vec<Rect>,
    pub stage_left: Rect,
    pub stage_right: Rect,
    pub stage_bottom: Rect,
    pub judgement_line: JudgementLine,
}

impl StageLayout {
    pub fn compute(
        skin: &SkinConfiguration,
        screen: [f32; 2],
        direction: ScrollDirection,
        sprites: &StageSprites,
    ) -> Result<Self, PlayfieldError> {
        let key_caps = (0..skin.keys)
            .map(|i| key_cap_rect(skin, i, screen, direction, sprites.key_cap_height))
            .collect::<Result<Vec<_>, _>>()?;
        let column_backgrounds = (0..skin.keys)
            .map(|i| column_background_rect(skin, i, screen))
            .collect::<Result<Vec<_>, _>>()?;
        let (stage_left, stage_right) = stage_border_rects(skin, screen, sprites);
        Ok(Self {
            key_caps,
            column_backgrounds,
            stage_left,
            stage_right,
            stage_bottom: stage_bottom_rect(skin, screen, sprites),
            judgement_line: judgement_line(skin, screen, direction),
        })
    }
}
