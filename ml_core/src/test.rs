#![cfg(test)]

use ndarray::{Array3, Array4, Axis, array};
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{
    MlErr,
    arch::{ActFn, ClassificationModel, LayerRole, SequentialNet, Value, layers::Layer},
};

fn spatial(shape: (usize, usize, usize), values: Vec<f32>) -> Value {
    Value::Spatial(Array3::from_shape_vec(shape, values).unwrap())
}

fn batch(shape: (usize, usize, usize), values: Vec<f32>) -> Array4<f32> {
    Array3::from_shape_vec(shape, values)
        .unwrap()
        .insert_axis(Axis(0))
}

#[test]
fn test_dense_forward_matches_hand_computed_values() {
    let layer = Layer::dense(
        "d",
        (2, 2),
        vec![1., 2., 3., 4.],
        vec![0.5, -0.5],
        ActFn::Linear,
    )
    .unwrap();

    let y = layer.forward(&Value::Flat(array![1., 1.])).unwrap();
    let y = y.as_flat().unwrap();
    assert_eq!(y, &array![4.5, 5.5]);
}

#[test]
fn test_softmax_is_a_distribution_and_its_gradient_sums_to_zero() {
    let a = ActFn::Softmax.apply(array![1., 2., 3.]);
    assert!((a.sum() - 1.0).abs() < 1e-6);
    assert!(a.iter().all(|&p| p > 0.0 && p < 1.0));

    let d = ActFn::Softmax.grad(&a, &array![1., 0., 0.]);
    assert!(d.sum().abs() < 1e-6);
}

#[test]
fn test_relu_gradient_masks_inactive_units() {
    let a = array![0., 2., 0.5];
    let d = ActFn::Relu.grad(&a, &array![1., 1., 1.]);
    assert_eq!(d, array![0., 1., 1.]);
}

#[test]
fn test_conv_forward_computes_window_sums() {
    let layer = Layer::conv2("c", (2, 2), 1, 1, vec![1.; 4], vec![0.], false).unwrap();
    let x = spatial((3, 3, 1), (1..=9).map(|v| v as f32).collect());

    let y = layer.forward(&x).unwrap();
    let y = y.as_spatial().unwrap();
    assert_eq!(y.dim(), (2, 2, 1));
    assert_eq!(y[[0, 0, 0]], 12.);
    assert_eq!(y[[0, 1, 0]], 16.);
    assert_eq!(y[[1, 0, 0]], 24.);
    assert_eq!(y[[1, 1, 0]], 28.);
}

#[test]
fn test_conv_rejects_mismatched_weight_length() {
    let err = Layer::conv2("c", (3, 3), 3, 8, vec![0.; 10], vec![0.; 8], true).unwrap_err();
    assert!(matches!(err, MlErr::ShapeMismatch { .. }));
}

#[test]
fn test_max_pool_routes_gradient_to_window_argmax() {
    let layer = Layer::max_pool2("p", 2).unwrap();
    let x = spatial((2, 2, 1), vec![1., 2., 3., 4.]);

    let y = layer.forward(&x).unwrap();
    assert_eq!(y.as_spatial().unwrap()[[0, 0, 0]], 4.);

    let d = spatial((1, 1, 1), vec![5.]);
    let dx = layer.backward(&x, &y, &d).unwrap();
    let dx = dx.as_spatial().unwrap();
    assert_eq!(dx[[1, 1, 0]], 5.);
    assert_eq!(dx.sum(), 5.);
}

#[test]
fn test_global_avg_pool_spreads_gradient_evenly() {
    let layer = Layer::global_avg_pool("gap");
    let x = spatial((2, 2, 1), vec![1., 2., 3., 4.]);

    let y = layer.forward(&x).unwrap();
    assert_eq!(y.as_flat().unwrap(), &array![2.5]);

    let d = Value::Flat(array![2.]);
    let dx = layer.backward(&x, &y, &d).unwrap();
    let dx = dx.as_spatial().unwrap();
    assert!(dx.iter().all(|&v| (v - 0.5).abs() < 1e-6));
}

#[test]
fn test_flatten_gradient_restores_the_spatial_shape() {
    let layer = Layer::flatten("f");
    let x = spatial((2, 1, 2), vec![1., 2., 3., 4.]);

    let y = layer.forward(&x).unwrap();
    assert_eq!(y.as_flat().unwrap().len(), 4);

    let d = Value::Flat(array![1., 2., 3., 4.]);
    let dx = layer.backward(&x, &y, &d).unwrap();
    assert_eq!(dx.as_spatial().unwrap().dim(), (2, 1, 2));
}

#[test]
fn test_activation_gradient_walks_back_to_a_spatial_layer() {
    // Identity pool, global average, then a single sigmoid unit with
    // weight 2: d(sigmoid(2 * mean(x))) / dx = a * (1 - a) * 2 / 4.
    let net = SequentialNet::new([
        Layer::max_pool2("pool", 1).unwrap(),
        Layer::global_avg_pool("gap"),
        Layer::dense("out", (1, 1), vec![2.], vec![0.], ActFn::Sigmoid).unwrap(),
    ]);

    let input = batch((2, 2, 1), vec![1., 2., 3., 4.]);
    let trace = net.traced_forward(&input).unwrap();
    let a = trace.output()[0];
    assert!((a - 1.0 / (1.0 + (-5.0f32).exp())).abs() < 1e-6);

    let grad = net.activation_gradient(&trace, 0, 0).unwrap();
    let expected = a * (1.0 - a) * 2.0 / 4.0;
    assert_eq!(grad.dim(), (2, 2, 1));
    assert!(grad.iter().all(|&g| (g - expected).abs() < 1e-6));
}

#[test]
fn test_gradient_through_a_convolution_is_unsupported() {
    let conv = Layer::conv2("c", (1, 1), 1, 1, vec![1.], vec![0.], false).unwrap();
    let x = spatial((1, 1, 1), vec![1.]);
    let y = conv.forward(&x).unwrap();

    let err = conv.backward(&x, &y, &y).unwrap_err();
    assert!(matches!(err, MlErr::GradientUnsupported { .. }));
}

#[test]
fn test_predict_rejects_multi_sample_batches() {
    let net = SequentialNet::new([Layer::global_avg_pool("gap")]);
    let input = Array4::zeros((2, 2, 2, 1));

    let err = net.predict(&input).unwrap_err();
    assert!(matches!(err, MlErr::BadBatch { got: 2 }));
}

#[test]
fn test_catalog_reports_roles_ranks_and_parameter_counts() {
    let net = SequentialNet::new([
        Layer::conv2("c1", (2, 2), 1, 3, vec![0.; 12], vec![0.; 3], true).unwrap(),
        Layer::max_pool2("p1", 2).unwrap(),
        Layer::global_avg_pool("gap"),
        Layer::dense("out", (3, 1), vec![0.; 3], vec![0.], ActFn::Sigmoid).unwrap(),
    ]);

    let catalog = net.catalog();
    assert_eq!(catalog.len(), 4);
    assert_eq!(catalog[0].role, LayerRole::Convolution);
    assert_eq!(catalog[0].output_rank, 4);
    assert_eq!(catalog[0].params, 15);
    assert_eq!(catalog[1].role, LayerRole::Pooling);
    assert_eq!(catalog[2].output_rank, 2);
    assert_eq!(catalog[3].role, LayerRole::Dense);
    assert_eq!(net.num_params(), 15 + 4);
}

#[test]
fn test_random_sigmoid_head_stays_in_probability_range() {
    let mut rng = StdRng::seed_from_u64(7);
    let weights: Vec<f32> = (0..4 * 4 * 3 * 2)
        .map(|_| rng.random_range(-0.5..0.5))
        .collect();

    let net = SequentialNet::new([
        Layer::conv2("c1", (4, 4), 3, 2, weights, vec![0.; 2], true).unwrap(),
        Layer::global_avg_pool("gap"),
        Layer::dense("out", (2, 1), vec![0.3, -0.7], vec![0.1], ActFn::Sigmoid).unwrap(),
    ]);

    let input = Array4::from_shape_fn((1, 8, 8, 3), |_| rng.random_range(0.0..1.0));
    let y = net.predict(&input).unwrap();
    assert_eq!(y.len(), 1);
    assert!(y[0] > 0.0 && y[0] < 1.0);
}

#[test]
fn test_layers_and_traces_are_debug_printable() {
    // Assertion helpers format the Ok side of fallible constructors and
    // forward passes, so these types must stay Debug.
    let layer = Layer::dense("d", (1, 1), vec![1.], vec![0.], ActFn::Linear).unwrap();
    assert!(format!("{layer:?}").contains("Dense"));

    let net = SequentialNet::new([Layer::global_avg_pool("gap")]);
    let trace = net.traced_forward(&Array4::zeros((1, 2, 2, 1))).unwrap();
    assert!(format!("{trace:?}").contains("activations"));
}

#[test]
fn test_traced_forward_requires_a_flat_head() {
    let net = SequentialNet::new([Layer::max_pool2("p", 1).unwrap()]);
    let input = Array4::zeros((1, 2, 2, 1));

    let err = net.traced_forward(&input).unwrap_err();
    assert!(matches!(err, MlErr::FlatOutputExpected));
}
