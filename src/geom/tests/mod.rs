mod test_curve_basic;
mod test_nurbs_basis;
