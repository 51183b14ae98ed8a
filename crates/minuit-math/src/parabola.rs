//! Parabolic interpolation.
//!
//! Used by the line search and by the confidence-interval root search to
//! predict a minimum or a crossing from a few sampled points.

/// A sampled point `(x, f(x))`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParabolaPoint {
    /// Abscissa.
    pub x: f64,
    /// Function value.
    pub y: f64,
}

impl ParabolaPoint {
    /// Creates a point.
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// The parabola `y = a·x² + b·x + c`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Parabola {
    a: f64,
    b: f64,
    c: f64,
}

impl Parabola {
    /// Creates a parabola from its coefficients.
    #[must_use]
    pub fn new(a: f64, b: f64, c: f64) -> Self {
        Self { a, b, c }
    }

    /// Parabola through three points.
    ///
    /// The abscissae are shifted to their mean before solving to limit
    /// cancellation.
    #[must_use]
    pub fn through_points(p1: ParabolaPoint, p2: ParabolaPoint, p3: ParabolaPoint) -> Self {
        let dx12 = p1.x - p2.x;
        let dx13 = p1.x - p3.x;
        let dx23 = p2.x - p3.x;
        let xm = (p1.x + p2.x + p3.x) / 3.0;
        let x1 = p1.x - xm;
        let x2 = p2.x - xm;
        let x3 = p3.x - xm;
        let (y1, y2, y3) = (p1.y, p2.y, p3.y);

        let a = y1 / (dx12 * dx13) - y2 / (dx12 * dx23) + y3 / (dx13 * dx23);
        let b = -y1 * (x2 + x3) / (dx12 * dx13) + y2 * (x1 + x3) / (dx12 * dx23)
            - y3 * (x1 + x2) / (dx13 * dx23);
        let mut c = y1 - a * x1 * x1 - b * x1;

        c += xm * (xm * a - b);
        let b = b - 2.0 * xm * a;
        Self { a, b, c }
    }

    /// Parabola through two points with the slope `dydx1` known at the first.
    #[must_use]
    pub fn through_points_with_slope(p1: ParabolaPoint, dydx1: f64, p2: ParabolaPoint) -> Self {
        let x1 = p1.x;
        let dx = p2.x - x1;
        let a = (p2.y - p1.y - dydx1 * dx) / (dx * dx);
        let b = dydx1 - 2.0 * a * x1;
        let c = p1.y - a * x1 * x1 - b * x1;
        Self { a, b, c }
    }

    /// Quadratic coefficient.
    pub fn a(&self) -> f64 {
        self.a
    }

    /// Linear coefficient.
    pub fn b(&self) -> f64 {
        self.b
    }

    /// Constant coefficient.
    pub fn c(&self) -> f64 {
        self.c
    }

    /// Value at `x`.
    pub fn y(&self, x: f64) -> f64 {
        self.a * x * x + self.b * x + self.c
    }

    /// Abscissa of the extremum.
    pub fn x_min(&self) -> f64 {
        -self.b / (2.0 * self.a)
    }

    /// Value at the extremum.
    pub fn y_min(&self) -> f64 {
        self.c - self.b * self.b / (4.0 * self.a)
    }

    /// Larger abscissa where the parabola takes the value `y`.
    pub fn x_pos(&self, y: f64) -> f64 {
        let xm = self.x_min();
        (y / self.a + xm * xm - self.c / self.a).sqrt() + xm
    }

    /// Smaller abscissa where the parabola takes the value `y`.
    pub fn x_neg(&self, y: f64) -> f64 {
        let xm = self.x_min();
        -(y / self.a + xm * xm - self.c / self.a).sqrt() + xm
    }
}
