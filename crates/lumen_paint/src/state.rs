//! Per-frame drawing state
//!
//! The canvas keeps a stack of [`State`] values. `save()` pushes a deep
//! copy (dash pattern included), so restoring never observes later edits.

use lumen_core::{Affine2D, Color};
use smallvec::SmallVec;

use crate::paint::{CompositeOperationState, LineCap, LineJoin, Paint, Scissor};
use crate::text::{FontId, TextAlign, TextBaseline};

#[derive(Clone, Debug, PartialEq)]
pub struct State {
    pub fill: Paint,
    pub stroke: Paint,
    pub composite: CompositeOperationState,
    pub shape_anti_alias: bool,
    pub stroke_width: f32,
    pub miter_limit: f32,
    pub line_join: LineJoin,
    pub line_cap: LineCap,
    pub alpha: f32,
    pub transform: Affine2D,
    pub scissor: Scissor,
    pub text_align: TextAlign,
    pub text_baseline: TextBaseline,
    pub font: Option<FontId>,
    pub font_size: f32,
    pub dash: SmallVec<[f32; 8]>,
    pub dash_offset: f32,
}

impl Default for State {
    fn default() -> Self {
        Self {
            fill: Paint::color(Color::WHITE),
            stroke: Paint::color(Color::BLACK),
            composite: CompositeOperationState::default(),
            shape_anti_alias: true,
            stroke_width: 1.0,
            miter_limit: 10.0,
            line_join: LineJoin::Miter,
            line_cap: LineCap::Butt,
            alpha: 1.0,
            transform: Affine2D::IDENTITY,
            scissor: Scissor::default(),
            text_align: TextAlign::Left,
            text_baseline: TextBaseline::Alphabetic,
            font: None,
            font_size: 16.0,
            dash: SmallVec::new(),
            dash_offset: 0.0,
        }
    }
}
