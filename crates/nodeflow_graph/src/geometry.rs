// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection end points and curve shape.

use crate::port::PortType;
use egui::{Pos2, Rect, Vec2};

/// Connection visual parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConnectionStyle {
    /// Maximum horizontal tangent length of the bezier
    pub curvature: f32,
    /// Stroke width
    pub line_width: f32,
}

impl Default for ConnectionStyle {
    fn default() -> Self {
        Self {
            curvature: 50.0,
            line_width: 2.5,
        }
    }
}

/// End points of a connection in scene coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionGeometry {
    in_point: Pos2,
    out_point: Pos2,
    style: ConnectionStyle,
    hovered: bool,
}

impl ConnectionGeometry {
    /// Create geometry with both ends at the origin
    pub fn new(style: ConnectionStyle) -> Self {
        Self {
            in_point: Pos2::ZERO,
            out_point: Pos2::ZERO,
            style,
            hovered: false,
        }
    }

    /// Get the end point on a side
    pub fn end_point(&self, side: PortType) -> Option<Pos2> {
        match side {
            PortType::In => Some(self.in_point),
            PortType::Out => Some(self.out_point),
            PortType::None => None,
        }
    }

    /// Set the end point on a side
    pub fn set_end_point(&mut self, side: PortType, pos: Pos2) {
        match side {
            PortType::In => self.in_point = pos,
            PortType::Out => self.out_point = pos,
            PortType::None => {}
        }
    }

    /// Shift the end point on a side
    pub fn move_end_point(&mut self, side: PortType, offset: Vec2) {
        match side {
            PortType::In => self.in_point += offset,
            PortType::Out => self.out_point += offset,
            PortType::None => {}
        }
    }

    /// Bezier control points, leaving the output rightwards and entering the input from the left
    pub fn control_points(&self) -> (Pos2, Pos2) {
        let distance = (self.in_point.x - self.out_point.x).abs();
        let curvature = self.style.curvature.min(distance * 0.5);

        let ctrl1 = Pos2::new(self.out_point.x + curvature, self.out_point.y);
        let ctrl2 = Pos2::new(self.in_point.x - curvature, self.in_point.y);
        (ctrl1, ctrl2)
    }

    /// Points along the curve from the output end to the input end
    pub fn curve_points(&self, segments: usize) -> Vec<Pos2> {
        let segments = segments.max(1);
        let (p1, p2) = self.control_points();
        let (p0, p3) = (self.out_point, self.in_point);

        (0..=segments)
            .map(|i| {
                let t = i as f32 / segments as f32;
                let mt = 1.0 - t;
                let a = mt * mt * mt;
                let b = 3.0 * mt * mt * t;
                let c = 3.0 * mt * t * t;
                let d = t * t * t;
                Pos2::new(
                    a * p0.x + b * p1.x + c * p2.x + d * p3.x,
                    a * p0.y + b * p1.y + c * p2.y + d * p3.y,
                )
            })
            .collect()
    }

    /// Rect covering the curve and its stroke
    pub fn bounding_rect(&self) -> Rect {
        let (ctrl1, ctrl2) = self.control_points();
        Rect::from_points(&[self.out_point, ctrl1, ctrl2, self.in_point])
            .expand(self.style.line_width)
    }

    /// Stroke width
    pub fn line_width(&self) -> f32 {
        self.style.line_width
    }

    /// Check if the pointer is over the connection
    pub fn hovered(&self) -> bool {
        self.hovered
    }

    /// Set the hover flag
    pub fn set_hovered(&mut self, hovered: bool) {
        self.hovered = hovered;
    }
}

impl Default for ConnectionGeometry {
    fn default() -> Self {
        Self::new(ConnectionStyle::default())
    }
}
