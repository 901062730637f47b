use super::*;
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand::rngs::StdRng;

#[test]
fn random_uniform_stays_in_range_test() {
    let mut rng = StdRng::seed_from_u64(7);
    let init = Initializer::RandomUniform {
        minval: -0.05,
        maxval: 0.05,
    };

    let values = init.initialize((784, 256), &mut rng).unwrap();

    assert_eq!(values.dim(), (784, 256));
    assert!(values.iter().all(|&v| (-0.05..0.05).contains(&v)));
    // a range this wide is not collapsed to a constant
    let distinct = values.iter().filter(|&&v| v != values[[0, 0]]).count();
    assert!(distinct > 0);
}

#[test]
fn constant_and_zeros_test() {
    let mut rng = StdRng::seed_from_u64(0);

    let constant = Initializer::Constant(0.0).initialize((1, 128), &mut rng).unwrap();
    assert!(constant.iter().all(|&v| v == 0.0));

    let threes = Initializer::Constant(3.0).initialize((2, 2), &mut rng).unwrap();
    assert_eq!(threes, Array2::from_elem((2, 2), 3.0f32));

    let zeros = Initializer::Zeros.initialize((3, 4), &mut rng).unwrap();
    assert_eq!(zeros, Array2::<f32>::zeros((3, 4)));
}

#[test]
fn glorot_uniform_limit_test() {
    let mut rng = StdRng::seed_from_u64(1);
    let values = Initializer::GlorotUniform
        .initialize((64, 10), &mut rng)
        .unwrap();

    let limit = (6.0f32 / 74.0).sqrt();
    assert!(values.iter().all(|&v| v.abs() <= limit));
}

#[test]
fn invalid_initializers_test() {
    let mut rng = StdRng::seed_from_u64(2);

    let reversed = Initializer::RandomUniform {
        minval: 0.05,
        maxval: -0.05,
    };
    assert!(reversed.initialize((2, 2), &mut rng).is_err());

    let empty = Initializer::RandomUniform {
        minval: 0.1,
        maxval: 0.1,
    };
    assert!(empty.validate().is_err());

    assert!(Initializer::Constant(f32::INFINITY).validate().is_err());
}

#[test]
fn same_seed_same_weights_test() {
    let mut a = StdRng::seed_from_u64(42);
    let mut b = StdRng::seed_from_u64(42);
    let init = Initializer::RandomUniform {
        minval: -0.05,
        maxval: 0.05,
    };

    assert_eq!(
        init.initialize((5, 5), &mut a).unwrap(),
        init.initialize((5, 5), &mut b).unwrap()
    );
}
