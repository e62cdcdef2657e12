//! Background models of a powder experiment
//!
//! The background is a collection category: either control points joined by
//! straight lines, or Chebyshev polynomial terms. The intensity of every
//! point (`y`) or term (`coef`) is a refinable parameter; positions and
//! orders are descriptors and name their entries.

use crate::categories::{entry_key, CategoryCollection, CategoryCore, CategoryItem};
use crate::collection::Keyed;
use crate::model::{string_enum, ModelError, ParamSpec};
use crate::parameters::{Attribute, AttributeMeta, Descriptor, DescriptorRef, Identity, ParameterRef};
use ndarray::Array1;
use std::rc::Rc;

string_enum! {
    BackgroundType, "background type" {
        LineSegment => "line-segment",
        Chebyshev => "chebyshev polynomial",
    }
}

/// Control point of a line-segment background
#[derive(Debug)]
pub struct LineSegment {
    core: CategoryCore,
    pub x: DescriptorRef,
    pub y: ParameterRef,
}

impl LineSegment {
    pub fn new(x: f64, y: f64) -> Result<Self, ModelError> {
        let mut core = CategoryCore::new("background");
        let x = core.attach_descriptor(Descriptor::new(
            AttributeMeta::new("x", &["_pd_background.line_segment_X"])?
                .with_description("Position of a background control point"),
            x,
        ));
        let y = ParamSpec::new("y", "_pd_background.line_segment_intensity", y)
            .description("Background intensity at the control point")
            .attach(&mut core)?;
        core.name_after(&x);
        Ok(Self { core, x, y })
    }
}

impl CategoryItem for LineSegment {
    fn core(&self) -> &CategoryCore {
        &self.core
    }
}

impl Keyed for LineSegment {
    fn key(&self) -> String {
        entry_key(self)
    }
}

/// One term `coef * T_order(u)` of a Chebyshev background
#[derive(Debug)]
pub struct PolynomialTerm {
    core: CategoryCore,
    pub order: DescriptorRef,
    pub coef: ParameterRef,
}

impl PolynomialTerm {
    /// # Returns
    ///
    /// The term, or [`ModelError::InvalidOrder`] unless `order` is a
    /// non-negative integer
    pub fn new(order: f64, coef: f64) -> Result<Self, ModelError> {
        if !(order >= 0.0 && order.fract() == 0.0) {
            return Err(ModelError::InvalidOrder { order });
        }
        let mut core = CategoryCore::new("background");
        let order = core.attach_descriptor(Descriptor::new(
            AttributeMeta::new("order", &["_pd_background.Chebyshev_order"])?,
            order,
        ));
        let coef = ParamSpec::new("coef", "_pd_background.Chebyshev_coef", coef)
            .description("Chebyshev polynomial coefficient")
            .attach(&mut core)?;
        core.name_after(&order);
        Ok(Self { core, order, coef })
    }

    fn degree(&self) -> Option<usize> {
        let order = self.order.number()?;
        (order >= 0.0 && order.fract() == 0.0).then_some(order as usize)
    }
}

impl CategoryItem for PolynomialTerm {
    fn core(&self) -> &CategoryCore {
        &self.core
    }
}

impl Keyed for PolynomialTerm {
    fn key(&self) -> String {
        entry_key(self)
    }
}

/// The `background` category of an experiment
#[derive(Debug)]
pub enum Background {
    LineSegment(CategoryCollection<LineSegment>),
    Chebyshev(CategoryCollection<PolynomialTerm>),
}

impl Background {
    /// Empty background of the given type
    pub fn create(background_type: BackgroundType) -> Self {
        match background_type {
            BackgroundType::LineSegment => Background::LineSegment(CategoryCollection::new("background")),
            BackgroundType::Chebyshev => Background::Chebyshev(CategoryCollection::new("background")),
        }
    }

    pub fn background_type(&self) -> BackgroundType {
        match self {
            Background::LineSegment(_) => BackgroundType::LineSegment,
            Background::Chebyshev(_) => BackgroundType::Chebyshev,
        }
    }

    pub fn identity(&self) -> &Rc<Identity> {
        match self {
            Background::LineSegment(points) => points.identity(),
            Background::Chebyshev(terms) => terms.identity(),
        }
    }

    /// Add a control point, replacing one at the same `x`
    pub fn add_point(&mut self, x: f64, y: f64) -> Result<(), ModelError> {
        match self {
            Background::LineSegment(points) => {
                if points.add(LineSegment::new(x, y)?).is_some() {
                    tracing::debug!(x, "Background point replaced");
                }
                Ok(())
            }
            Background::Chebyshev(_) => Err(ModelError::BackgroundMismatch {
                item: "control point",
                background: BackgroundType::Chebyshev.as_str(),
            }),
        }
    }

    /// Add a polynomial term, replacing one of the same order
    pub fn add_term(&mut self, order: f64, coef: f64) -> Result<(), ModelError> {
        match self {
            Background::Chebyshev(terms) => {
                if terms.add(PolynomialTerm::new(order, coef)?).is_some() {
                    tracing::debug!(order, "Background term replaced");
                }
                Ok(())
            }
            Background::LineSegment(_) => Err(ModelError::BackgroundMismatch {
                item: "polynomial term",
                background: BackgroundType::LineSegment.as_str(),
            }),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Background::LineSegment(points) => points.len(),
            Background::Chebyshev(terms) => terms.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn attributes(&self) -> Vec<Attribute> {
        match self {
            Background::LineSegment(points) => points.attributes(),
            Background::Chebyshev(terms) => terms.attributes(),
        }
    }

    pub fn parameters(&self) -> Vec<ParameterRef> {
        match self {
            Background::LineSegment(points) => points.parameters(),
            Background::Chebyshev(terms) => terms.parameters(),
        }
    }

    /// Background intensity at each `x`; zero when there are no entries
    pub fn calculate(&self, x: &Array1<f64>) -> Array1<f64> {
        if self.is_empty() {
            return Array1::zeros(x.len());
        }
        match self {
            Background::LineSegment(points) => interpolate(points, x),
            Background::Chebyshev(terms) => chebyshev(terms, x),
        }
    }
}

/// Linear interpolation between control points sorted by `x`, constant
/// beyond the outermost points
fn interpolate(points: &CategoryCollection<LineSegment>, x: &Array1<f64>) -> Array1<f64> {
    let mut nodes: Vec<(f64, f64)> = points
        .iter()
        .filter_map(|p| Some((p.x.number()?, p.y.value())))
        .collect();
    if nodes.is_empty() {
        return Array1::zeros(x.len());
    }
    nodes.sort_by(|a, b| a.0.total_cmp(&b.0));
    let (first, last) = (nodes[0], nodes[nodes.len() - 1]);

    x.mapv(|xi| {
        if xi <= first.0 {
            return first.1;
        }
        if xi >= last.0 {
            return last.1;
        }
        let i = nodes.partition_point(|&(px, _)| px <= xi);
        let (x0, y0) = nodes[i - 1];
        let (x1, y1) = nodes[i];
        if x1 == x0 {
            y1
        } else {
            y0 + (y1 - y0) * (xi - x0) / (x1 - x0)
        }
    })
}

/// Σ coef·T_order(u) with `x` mapped linearly onto u ∈ [-1, 1]
fn chebyshev(terms: &CategoryCollection<PolynomialTerm>, x: &Array1<f64>) -> Array1<f64> {
    let coefs: Vec<(usize, f64)> = terms
        .iter()
        .filter_map(|t| match t.degree() {
            Some(degree) => Some((degree, t.coef.value())),
            None => {
                tracing::warn!(uid = %t.order.uid(), "Skipping term with a non-integer order");
                None
            }
        })
        .collect();
    let max_degree = coefs.iter().map(|&(d, _)| d).max().unwrap_or(0);

    let lo = x.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = x.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = hi - lo;

    x.mapv(|xi| {
        let u = if span > 0.0 { 2.0 * (xi - lo) / span - 1.0 } else { 0.0 };
        // T_0 .. T_max by the three-term recurrence
        let mut t = vec![1.0; max_degree + 1];
        if max_degree >= 1 {
            t[1] = u;
        }
        for n in 2..=max_degree {
            t[n] = 2.0 * u * t[n - 1] - t[n - 2];
        }
        coefs.iter().map(|&(d, c)| c * t[d]).sum()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_line_segment_interpolation() {
        let mut background = Background::create(BackgroundType::LineSegment);
        background.add_point(30.0, 300.0).unwrap();
        background.add_point(10.0, 100.0).unwrap();
        background.add_point(20.0, 100.0).unwrap();

        let y = background.calculate(&array![0.0, 10.0, 15.0, 25.0, 30.0, 40.0]);
        assert_eq!(y, array![100.0, 100.0, 100.0, 200.0, 300.0, 300.0]);
    }

    #[test]
    fn test_point_at_same_x_is_replaced() {
        let mut background = Background::create(BackgroundType::LineSegment);
        background.add_point(10.0, 100.0).unwrap();
        background.add_point(10.0, 50.0).unwrap();
        assert_eq!(background.len(), 1);
        assert_eq!(background.calculate(&array![0.0, 20.0]), array![50.0, 50.0]);
    }

    #[test]
    fn test_chebyshev_terms() {
        let mut background = Background::create(BackgroundType::Chebyshev);
        background.add_term(0.0, 1.0).unwrap();
        background.add_term(2.0, 0.5).unwrap();

        // u = [-1, 0, 1]; T_2(u) = 2u² - 1
        let y = background.calculate(&array![0.0, 5.0, 10.0]);
        assert_relative_eq!(y[0], 1.5);
        assert_relative_eq!(y[1], 0.5);
        assert_relative_eq!(y[2], 1.5);
    }

    #[test]
    fn test_empty_background_is_zero() {
        let background = Background::create(BackgroundType::Chebyshev);
        assert_eq!(background.calculate(&array![1.0, 2.0]), array![0.0, 0.0]);
    }

    #[test]
    fn test_item_must_match_background_type() {
        let mut background = Background::create(BackgroundType::Chebyshev);
        assert!(matches!(
            background.add_point(1.0, 2.0),
            Err(ModelError::BackgroundMismatch { .. })
        ));
        assert!(matches!(
            background.add_term(1.5, 2.0),
            Err(ModelError::InvalidOrder { .. })
        ));
        assert!(background.is_empty());
    }

    #[test]
    fn test_only_intensities_are_parameters() {
        let mut background = Background::create(BackgroundType::LineSegment);
        background.add_point(10.0, 100.0).unwrap();
        background.add_point(20.0, 120.0).unwrap();

        assert_eq!(background.attributes().len(), 4);
        let names: Vec<String> = background.parameters().iter().map(ParameterRef::name).collect();
        assert_eq!(names, vec!["y", "y"]);
    }
}
