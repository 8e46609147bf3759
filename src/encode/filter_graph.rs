use crate::foundation::core::{Canvas, PixelBox};

/// A stream label in a filter graph, e.g. `0:v` or `g1`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Label(String);

impl Label {
    /// Label with an arbitrary name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Video stream of command-line input `idx`.
    pub fn input(idx: usize) -> Self {
        Self(format!("{idx}:v"))
    }

    /// Name without brackets.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

const NO_LABELS: [Label; 0] = [];

/// One filter operation.
#[derive(Clone, Debug, PartialEq)]
pub enum FilterOp {
    /// Duplicate the input; the number of copies is the node's output count.
    Split,
    /// Resize, nearest-neighbour when `neighbor` is set.
    Scale {
        /// Target width.
        width: u32,
        /// Target height.
        height: u32,
        /// Use nearest-neighbour sampling.
        neighbor: bool,
    },
    /// Draw the second input over the first at `(x, y)`.
    Overlay {
        /// Left edge.
        x: i64,
        /// Top edge.
        y: i64,
        /// End when the shortest input ends.
        shortest: bool,
    },
    /// Keep every `every`-th frame.
    SelectEvery {
        /// Frame stride (> 1).
        every: u32,
    },
    /// Re-time frames to a constant `frame_ms` spacing.
    ConstantPts {
        /// Milliseconds per frame.
        frame_ms: u32,
    },
    /// Fully transparent canvas source.
    Transparent {
        /// Canvas size.
        canvas: Canvas,
        /// Milliseconds per frame.
        frame_ms: u32,
    },
    /// Build an optimal palette over the whole stream.
    PaletteGen {
        /// Palette size including the reserved transparent slot.
        max_colors: u32,
        /// Reserve one index for transparency.
        reserve_transparent: bool,
    },
    /// Map frames onto the palette from the second input.
    PaletteUse {
        /// Alpha below which pixels become transparent.
        alpha_threshold: u8,
    },
}

impl std::fmt::Display for FilterOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Split => f.write_str("split"),
            Self::Scale {
                width,
                height,
                neighbor,
            } => {
                write!(f, "scale={width}:{height}")?;
                if *neighbor {
                    f.write_str(":flags=neighbor")?;
                }
                Ok(())
            }
            Self::Overlay { x, y, shortest } => {
                write!(f, "overlay={x}:{y}")?;
                if *shortest {
                    f.write_str(":shortest=1")?;
                }
                Ok(())
            }
            // The comma is escaped so it is not read as a filter separator.
            Self::SelectEvery { every } => write!(f, "select=not(mod(n\\,{every}))"),
            Self::ConstantPts { frame_ms } => write!(f, "setpts=N*{frame_ms}/1000/TB"),
            Self::Transparent { canvas, frame_ms } => write!(
                f,
                "color=c=black@0.0:s={}x{}:r=1000/{frame_ms},format=rgba",
                canvas.width, canvas.height
            ),
            Self::PaletteGen {
                max_colors,
                reserve_transparent,
            } => write!(
                f,
                "palettegen=max_colors={max_colors}:reserve_transparent={}:stats_mode=full",
                u8::from(*reserve_transparent)
            ),
            Self::PaletteUse { alpha_threshold } => {
                write!(f, "paletteuse=alpha_threshold={alpha_threshold}")
            }
        }
    }
}

/// `inputs -> op -> outputs`.
#[derive(Clone, Debug, PartialEq)]
pub struct FilterNode {
    /// Consumed labels, in order.
    pub inputs: Vec<Label>,
    /// Operation.
    pub op: FilterOp,
    /// Produced labels.
    pub outputs: Vec<Label>,
}

/// Ordered list of filter nodes, rendered to ffmpeg's `-filter_complex` syntax by
/// [`FilterGraph::render`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilterGraph {
    nodes: Vec<FilterNode>,
}

impl FilterGraph {
    /// Empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node.
    pub fn push(
        &mut self,
        inputs: impl IntoIterator<Item = Label>,
        op: FilterOp,
        outputs: impl IntoIterator<Item = Label>,
    ) -> &mut Self {
        self.nodes.push(FilterNode {
            inputs: inputs.into_iter().collect(),
            op,
            outputs: outputs.into_iter().collect(),
        });
        self
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> &[FilterNode] {
        &self.nodes
    }

    /// Split `input` and quantise it through a generated palette. The result is the graph's
    /// unlabelled final output.
    pub fn push_palette_tail(&mut self, input: Label, palette: &PaletteOpts) -> &mut Self {
        let s0 = Label::new("s0");
        let s1 = Label::new("s1");
        let p = Label::new("p");
        self.push([input], FilterOp::Split, [s0.clone(), s1.clone()])
            .push(
                [s0],
                FilterOp::PaletteGen {
                    max_colors: palette.max_colors,
                    reserve_transparent: palette.reserve_transparent,
                },
                [p.clone()],
            )
            .push(
                [s1, p],
                FilterOp::PaletteUse {
                    alpha_threshold: palette.alpha_threshold,
                },
                NO_LABELS,
            )
    }

    /// Render to ffmpeg's textual syntax: `[in]op[out];...`.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl std::fmt::Display for FilterGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, node) in self.nodes.iter().enumerate() {
            if i > 0 {
                f.write_str(";")?;
            }
            for l in &node.inputs {
                write!(f, "[{}]", l.as_str())?;
            }
            write!(f, "{}", node.op)?;
            for l in &node.outputs {
                write!(f, "[{}]", l.as_str())?;
            }
        }
        Ok(())
    }
}

/// Palette quantisation knobs shared by every graph that ends in a GIF.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PaletteOpts {
    /// Palette size (2..=256).
    pub max_colors: u32,
    /// Reserve one palette index for transparency.
    pub reserve_transparent: bool,
    /// Alpha below which a pixel maps to the transparent index.
    pub alpha_threshold: u8,
}

/// Inputs of the single-pass overlay graph.
#[derive(Clone, Copy, Debug)]
pub struct OverlayPlan<'a> {
    /// Output canvas.
    pub canvas: Canvas,
    /// Whether command-line input 0 is a background image.
    pub has_background: bool,
    /// Draw box per loop input, in layering order. Boxes must be non-empty.
    pub boxes: &'a [PixelBox],
    /// Output milliseconds per frame.
    pub frame_ms: u32,
    /// Keep every `frame_skip`-th source frame.
    pub frame_skip: u32,
}

/// Scale the base and every loop input, chain one overlay per loop (the last one with
/// `shortest=1`) and quantise the result.
pub fn overlay_graph(plan: &OverlayPlan<'_>, palette: &PaletteOpts) -> FilterGraph {
    let mut g = FilterGraph::new();
    let base = Label::new("g0");
    if plan.has_background {
        let pts = Label::new("bgpts");
        g.push(
            [Label::input(0)],
            FilterOp::ConstantPts {
                frame_ms: plan.frame_ms,
            },
            [pts.clone()],
        )
        .push(
            [pts],
            FilterOp::Scale {
                width: plan.canvas.width,
                height: plan.canvas.height,
                neighbor: true,
            },
            [base.clone()],
        );
    } else {
        g.push(
            NO_LABELS,
            FilterOp::Transparent {
                canvas: plan.canvas,
                frame_ms: plan.frame_ms,
            },
            [base.clone()],
        );
    }

    let first_input = usize::from(plan.has_background);
    for (i, b) in plan.boxes.iter().enumerate() {
        let mut cur = Label::input(first_input + i);
        if plan.frame_skip > 1 {
            let sel = Label::new(format!("sel{i}"));
            g.push(
                [cur],
                FilterOp::SelectEvery {
                    every: plan.frame_skip,
                },
                [sel.clone()],
            );
            cur = sel;
        }
        let pts = Label::new(format!("pts{i}"));
        g.push(
            [cur],
            FilterOp::ConstantPts {
                frame_ms: plan.frame_ms,
            },
            [pts.clone()],
        )
        .push(
            [pts],
            FilterOp::Scale {
                width: b.width,
                height: b.height,
                neighbor: true,
            },
            [Label::new(format!("g{}", i + 1))],
        );
    }

    let mut acc = base;
    let last = plan.boxes.len();
    for (i, b) in plan.boxes.iter().enumerate() {
        let out = if i + 1 == last {
            Label::new("ov")
        } else {
            Label::new(format!("bg{}", i + 1))
        };
        g.push(
            [acc, Label::new(format!("g{}", i + 1))],
            FilterOp::Overlay {
                x: b.x,
                y: b.y,
                shortest: i + 1 == last,
            },
            [out.clone()],
        );
        acc = out;
    }

    g.push_palette_tail(acc, palette);
    g
}

#[cfg(test)]
#[path = "../../tests/unit/encode/filter_graph.rs"]
mod tests;
