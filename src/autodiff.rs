//! Tape-based reverse-mode automatic differentiation.
//!
//! The forward pass records every operation on a [`Tape`]; a single
//! [`backward`](Tape::backward) sweep then yields the gradient of one output
//! with respect to every recorded input.  The operation set is the one the
//! angular-distance loss needs: arithmetic, trigonometry, `acos`, `abs` and
//! clamping.
//!
//! # Example
//! ```
//! use neutrino_direction::autodiff::Tape;
//!
//! let mut tape = Tape::new();
//! let x = tape.var(0.5);
//! let s = tape.sin(x);
//! let y = tape.mul(s, x);          // y = x·sin(x)
//! tape.backward(y);
//! let expected = 0.5_f64.sin() + 0.5 * 0.5_f64.cos();
//! assert!((tape.adjoint(x) - expected).abs() < 1e-12);
//! ```

/// Handle to a node on the tape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Var(pub(crate) usize);

#[derive(Debug, Clone, Copy)]
enum Op {
    /// Leaf that receives a gradient.
    Input,
    /// Leaf whose adjoint goes nowhere.
    Const,
    Add(usize, usize),
    Mul(usize, usize),
    /// `a * s` for a fixed scalar `s`.
    Scale(usize, f64),
    Sin(usize),
    Cos(usize),
    Acos(usize),
    Abs(usize),
    /// Gradient passes only where `lo <= a <= hi`.
    Clamp(usize, f64, f64),
}

#[derive(Debug, Clone)]
struct Node {
    val: f64,
    op: Op,
}

/// Reverse-mode AD tape.
///
/// Build the computation with [`var`](Tape::var), [`constant`](Tape::constant)
/// and the operation methods, call [`backward`](Tape::backward) on the output,
/// then read gradients with [`adjoint`](Tape::adjoint).
#[derive(Debug, Default)]
pub struct Tape {
    nodes: Vec<Node>,
    adjoints: Vec<f64>,
}

impl Tape {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            adjoints: Vec::with_capacity(capacity),
        }
    }

    /// Number of nodes on the tape.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    fn push(&mut self, val: f64, op: Op) -> Var {
        let idx = self.nodes.len();
        self.nodes.push(Node { val, op });
        Var(idx)
    }

    #[inline]
    fn v(&self, a: Var) -> f64 {
        self.nodes[a.0].val
    }

    // --- Leaves ---

    /// Record a differentiable input.
    pub fn var(&mut self, val: f64) -> Var {
        self.push(val, Op::Input)
    }

    /// Record a constant.
    pub fn constant(&mut self, val: f64) -> Var {
        self.push(val, Op::Const)
    }

    /// Primal value of a node.
    #[inline]
    pub fn value(&self, a: Var) -> f64 {
        self.v(a)
    }

    // --- Arithmetic ---

    pub fn add(&mut self, a: Var, b: Var) -> Var {
        self.push(self.v(a) + self.v(b), Op::Add(a.0, b.0))
    }

    pub fn mul(&mut self, a: Var, b: Var) -> Var {
        self.push(self.v(a) * self.v(b), Op::Mul(a.0, b.0))
    }

    pub fn scale(&mut self, a: Var, s: f64) -> Var {
        self.push(self.v(a) * s, Op::Scale(a.0, s))
    }

    /// Sum of `terms`; `0` for an empty slice.
    pub fn sum(&mut self, terms: &[Var]) -> Var {
        match terms.split_first() {
            None => self.constant(0.0),
            Some((&first, rest)) => rest.iter().fold(first, |acc, &t| self.add(acc, t)),
        }
    }

    /// Arithmetic mean of `terms`; `NaN` for an empty slice.
    pub fn mean(&mut self, terms: &[Var]) -> Var {
        let total = self.sum(terms);
        self.scale(total, 1.0 / terms.len() as f64)
    }

    // --- Elementary functions ---

    pub fn sin(&mut self, a: Var) -> Var {
        self.push(self.v(a).sin(), Op::Sin(a.0))
    }

    pub fn cos(&mut self, a: Var) -> Var {
        self.push(self.v(a).cos(), Op::Cos(a.0))
    }

    /// `acos(a)`; the derivative is unbounded at `a = ±1`.
    pub fn acos(&mut self, a: Var) -> Var {
        self.push(self.v(a).acos(), Op::Acos(a.0))
    }

    pub fn abs(&mut self, a: Var) -> Var {
        self.push(self.v(a).abs(), Op::Abs(a.0))
    }

    /// Clamp to `[lo, hi]`.  NaN stays NaN.
    pub fn clamp(&mut self, a: Var, lo: f64, hi: f64) -> Var {
        let va = self.v(a);
        let val = if va < lo {
            lo
        } else if va > hi {
            hi
        } else {
            va
        };
        self.push(val, Op::Clamp(a.0, lo, hi))
    }

    // --- Backward pass ---

    /// Propagate adjoints from `out` back to every node.
    ///
    /// Afterwards [`adjoint`](Tape::adjoint) returns ∂out/∂x.
    pub fn backward(&mut self, out: Var) {
        let n = self.nodes.len();
        self.adjoints.clear();
        self.adjoints.resize(n, 0.0);
        self.adjoints[out.0] = 1.0;

        for i in (0..n).rev() {
            let adj = self.adjoints[i];
            if adj == 0.0 {
                continue;
            }

            match self.nodes[i].op {
                Op::Input | Op::Const => {}
                Op::Add(a, b) => {
                    self.adjoints[a] += adj;
                    self.adjoints[b] += adj;
                }
                Op::Mul(a, b) => {
                    let va = self.nodes[a].val;
                    let vb = self.nodes[b].val;
                    self.adjoints[a] += adj * vb;
                    self.adjoints[b] += adj * va;
                }
                Op::Scale(a, s) => {
                    self.adjoints[a] += adj * s;
                }
                Op::Sin(a) => {
                    self.adjoints[a] += adj * self.nodes[a].val.cos();
                }
                Op::Cos(a) => {
                    self.adjoints[a] -= adj * self.nodes[a].val.sin();
                }
                Op::Acos(a) => {
                    let va = self.nodes[a].val;
                    self.adjoints[a] -= adj / (1.0 - va * va).sqrt();
                }
                Op::Abs(a) => {
                    let va = self.nodes[a].val;
                    if va > 0.0 {
                        self.adjoints[a] += adj;
                    } else if va < 0.0 {
                        self.adjoints[a] -= adj;
                    }
                }
                Op::Clamp(a, lo, hi) => {
                    let va = self.nodes[a].val;
                    if (lo..=hi).contains(&va) {
                        self.adjoints[a] += adj;
                    }
                }
            }
        }
    }

    /// ∂out/∂v from the last [`backward`](Tape::backward); `0` before that.
    #[inline]
    pub fn adjoint(&self, v: Var) -> f64 {
        self.adjoints.get(v.0).copied().unwrap_or(0.0)
    }
}
