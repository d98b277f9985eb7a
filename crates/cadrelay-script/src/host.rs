//! Rhai API for the design host
//!
//! The automated driver hands scripts a `Design` handle as their `run(ctx)`
//! argument. It records sketches, extrusions, and shells in a feature
//! timeline, standing in for a CAD application's modeling API.
//!
//! ```rhai
//! fn run(ctx) {
//!     let sketch = ctx.add_sketch("xy");
//!     ctx.add_circle(sketch, 0.0, 0.0, 12.0);
//!     let body = ctx.extrude(sketch, 20.0);
//!     ctx.shell(body, 2.0);
//!     ctx.fillet(body, 1.5);
//! }
//! ```

use parking_lot::Mutex;
use rhai::{Engine, EvalAltResult, INT};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised by design operations (surfaced to scripts as runtime errors)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HostError {
    #[error("Unknown sketch plane '{0}' (expected xy, yz, or xz)")]
    UnknownPlane(String),

    #[error("No sketch with index {0}")]
    NoSuchSketch(INT),

    #[error("No body with index {0}")]
    NoSuchBody(INT),

    #[error("Sketch {0} has no closed profile to extrude")]
    EmptyProfile(usize),

    #[error("{what} must be positive, got {value}")]
    NonPositive { what: &'static str, value: f64 },

    #[error("Shell thickness {thickness} is too large for body {body} of height {height}")]
    ShellTooThick { body: usize, thickness: f64, height: f64 },

    #[error("Body {0} is already shelled")]
    AlreadyShelled(usize),

    #[error("Fillet radius {radius} is too large for body {body} of height {height}")]
    FilletTooLarge { body: usize, radius: f64, height: f64 },
}

/// Construction plane a sketch lies on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plane {
    Xy,
    Yz,
    Xz,
}

impl Plane {
    /// Parse a plane name, case-insensitively
    pub fn parse(name: &str) -> Result<Self, HostError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "xy" => Ok(Plane::Xy),
            "yz" => Ok(Plane::Yz),
            "xz" => Ok(Plane::Xz),
            _ => Err(HostError::UnknownPlane(name.to_string())),
        }
    }
}

/// A closed 2D profile curve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Curve {
    Circle { center: [f64; 2], radius: f64 },
    Rectangle { min: [f64; 2], max: [f64; 2] },
}

/// A sketch and its curves
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sketch {
    pub plane: Plane,
    pub curves: Vec<Curve>,
}

/// A solid produced by a feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    /// Sketch the body was extruded from
    pub sketch: usize,
    /// Extrusion distance
    pub height: f64,
    /// Wall thickness once shelled
    pub shell_thickness: Option<f64>,
    /// Radii of fillets applied to the top edges
    #[serde(default)]
    pub fillets: Vec<f64>,
}

/// One step in the feature timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "feature", rename_all = "snake_case")]
pub enum Feature {
    Sketch { sketch: usize },
    Extrude { sketch: usize, body: usize, distance: f64 },
    Shell { body: usize, thickness: f64 },
    Fillet { body: usize, radius: f64 },
}

/// Recorded design state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Design {
    pub sketches: Vec<Sketch>,
    pub bodies: Vec<Body>,
    pub timeline: Vec<Feature>,
    /// Messages scripts wrote with `ctx.log(...)`
    pub log: Vec<String>,
}

impl Design {
    /// Start a sketch on a construction plane, returning its index
    pub fn add_sketch(&mut self, plane: &str) -> Result<usize, HostError> {
        let plane = Plane::parse(plane)?;
        self.sketches.push(Sketch {
            plane,
            curves: Vec::new(),
        });
        let index = self.sketches.len() - 1;
        self.timeline.push(Feature::Sketch { sketch: index });
        Ok(index)
    }

    /// Add a circle of `radius` centered at `(x, y)`
    pub fn add_circle(&mut self, sketch: INT, x: f64, y: f64, radius: f64) -> Result<(), HostError> {
        positive("radius", radius)?;
        self.sketch_mut(sketch)?.curves.push(Curve::Circle {
            center: [x, y],
            radius,
        });
        Ok(())
    }

    /// Add an axis-aligned rectangle spanning two corners
    pub fn add_rectangle(&mut self, sketch: INT, x0: f64, y0: f64, x1: f64, y1: f64) -> Result<(), HostError> {
        positive("rectangle width", (x1 - x0).abs())?;
        positive("rectangle height", (y1 - y0).abs())?;
        self.sketch_mut(sketch)?.curves.push(Curve::Rectangle {
            min: [x0.min(x1), y0.min(y1)],
            max: [x0.max(x1), y0.max(y1)],
        });
        Ok(())
    }

    /// Extrude a sketch's profile, returning the new body's index
    pub fn extrude(&mut self, sketch: INT, distance: f64) -> Result<usize, HostError> {
        positive("extrude distance", distance)?;
        let sketch_index = index(sketch, self.sketches.len()).ok_or(HostError::NoSuchSketch(sketch))?;
        if self.sketches[sketch_index].curves.is_empty() {
            return Err(HostError::EmptyProfile(sketch_index));
        }

        self.bodies.push(Body {
            sketch: sketch_index,
            height: distance,
            shell_thickness: None,
            fillets: Vec::new(),
        });
        let body = self.bodies.len() - 1;
        self.timeline.push(Feature::Extrude {
            sketch: sketch_index,
            body,
            distance,
        });
        Ok(body)
    }

    /// Hollow a body, leaving walls of `thickness`
    pub fn shell(&mut self, body: INT, thickness: f64) -> Result<(), HostError> {
        positive("shell thickness", thickness)?;
        let body_index = index(body, self.bodies.len()).ok_or(HostError::NoSuchBody(body))?;
        let target = &mut self.bodies[body_index];

        if target.shell_thickness.is_some() {
            return Err(HostError::AlreadyShelled(body_index));
        }
        if thickness >= target.height {
            return Err(HostError::ShellTooThick {
                body: body_index,
                thickness,
                height: target.height,
            });
        }

        target.shell_thickness = Some(thickness);
        self.timeline.push(Feature::Shell {
            body: body_index,
            thickness,
        });
        Ok(())
    }

    /// Round the top edges of a body
    pub fn fillet(&mut self, body: INT, radius: f64) -> Result<(), HostError> {
        positive("fillet radius", radius)?;
        let body_index = index(body, self.bodies.len()).ok_or(HostError::NoSuchBody(body))?;
        let target = &mut self.bodies[body_index];

        if radius * 2.0 > target.height {
            return Err(HostError::FilletTooLarge {
                body: body_index,
                radius,
                height: target.height,
            });
        }

        target.fillets.push(radius);
        self.timeline.push(Feature::Fillet {
            body: body_index,
            radius,
        });
        Ok(())
    }

    fn sketch_mut(&mut self, sketch: INT) -> Result<&mut Sketch, HostError> {
        let len = self.sketches.len();
        index(sketch, len)
            .map(|i| &mut self.sketches[i])
            .ok_or(HostError::NoSuchSketch(sketch))
    }
}

impl fmt::Display for Design {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Design: {} sketch(es), {} body(ies), {} feature(s)",
            self.sketches.len(),
            self.bodies.len(),
            self.timeline.len()
        )
    }
}

fn positive(what: &'static str, value: f64) -> Result<(), HostError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(HostError::NonPositive { what, value })
    }
}

fn index(value: INT, len: usize) -> Option<usize> {
    usize::try_from(value).ok().filter(|i| *i < len)
}

/// Shared handle to a design, cloneable into script scopes
#[derive(Debug, Clone, Default)]
pub struct DesignHandle {
    inner: Arc<Mutex<Design>>,
}

impl DesignHandle {
    /// Create a handle to an empty design
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current design state
    pub fn snapshot(&self) -> Design {
        self.inner.lock().clone()
    }

    /// Run `f` with the design locked
    pub fn with<R>(&self, f: impl FnOnce(&mut Design) -> R) -> R {
        f(&mut self.inner.lock())
    }
}

// ============================================================================
// Registration
// ============================================================================

fn script_error(err: HostError) -> Box<EvalAltResult> {
    err.to_string().into()
}

fn to_int(value: usize) -> INT {
    INT::try_from(value).unwrap_or(INT::MAX)
}

/// Register the design host API with a Rhai engine
pub fn register_host_api(engine: &mut Engine) {
    engine
        .register_type_with_name::<DesignHandle>("Design")
        .register_fn("to_string", |design: &mut DesignHandle| design.snapshot().to_string());

    // Sketching
    engine.register_fn(
        "add_sketch",
        |design: &mut DesignHandle, plane: &str| -> Result<INT, Box<EvalAltResult>> {
            design.with(|d| d.add_sketch(plane)).map(to_int).map_err(script_error)
        },
    );
    engine.register_fn(
        "add_circle",
        |design: &mut DesignHandle, sketch: INT, x: f64, y: f64, radius: f64| -> Result<(), Box<EvalAltResult>> {
            design.with(|d| d.add_circle(sketch, x, y, radius)).map_err(script_error)
        },
    );
    engine.register_fn(
        "add_rectangle",
        |design: &mut DesignHandle,
         sketch: INT,
         x0: f64,
         y0: f64,
         x1: f64,
         y1: f64|
         -> Result<(), Box<EvalAltResult>> {
            design
                .with(|d| d.add_rectangle(sketch, x0, y0, x1, y1))
                .map_err(script_error)
        },
    );

    // Features
    engine.register_fn(
        "extrude",
        |design: &mut DesignHandle, sketch: INT, distance: f64| -> Result<INT, Box<EvalAltResult>> {
            design.with(|d| d.extrude(sketch, distance)).map(to_int).map_err(script_error)
        },
    );
    engine.register_fn(
        "shell",
        |design: &mut DesignHandle, body: INT, thickness: f64| -> Result<(), Box<EvalAltResult>> {
            design.with(|d| d.shell(body, thickness)).map_err(script_error)
        },
    );
    engine.register_fn(
        "fillet",
        |design: &mut DesignHandle, body: INT, radius: f64| -> Result<(), Box<EvalAltResult>> {
            design.with(|d| d.fillet(body, radius)).map_err(script_error)
        },
    );

    // Introspection
    engine.register_fn("log", |design: &mut DesignHandle, message: &str| {
        design.with(|d| d.log.push(message.to_string()));
    });
    engine.register_fn("sketch_count", |design: &mut DesignHandle| {
        to_int(design.with(|d| d.sketches.len()))
    });
    engine.register_fn("body_count", |design: &mut DesignHandle| {
        to_int(design.with(|d| d.bodies.len()))
    });
}
