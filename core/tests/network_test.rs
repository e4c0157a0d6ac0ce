//! Integration tests for network construction, the two allocation
//! strategies, forward propagation, input policies and the diagnostic
//! accessors.

use microprop_core::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

fn heap_net<P: NumericProfile>(dims: Dimensions) -> Network<'static, P> {
    let mut allocation = Allocation::heap();
    Network::new(dims, &mut allocation, &mut rng(1)).unwrap()
}

// =============================================================================
// Construction Tests
// =============================================================================

#[test]
fn test_init_shapes() {
    let net = heap_net::<F32Profile>(Dimensions::new(3, 4, 2, 2));

    let props = net.properties();
    assert_eq!(props.num_layers, 4);
    assert_eq!(props.num_hidden_layers, 2);
    assert_eq!(props.network_response, 0);
    assert_eq!(net.strategy(), Strategy::Heap);

    let input = net.layer(LayerId::Input).unwrap();
    assert_eq!(input.activations.len(), 3);
    assert!(input.weights.is_empty());

    let h0 = net.layer(LayerId::Hidden(0)).unwrap();
    assert_eq!(h0.fan_in, 3);
    assert_eq!(h0.activations.len(), 4);
    assert_eq!(h0.biases.len(), 4);
    assert_eq!(h0.weights.len(), 12);

    let h1 = net.layer(LayerId::Hidden(1)).unwrap();
    assert_eq!(h1.fan_in, 4);
    assert_eq!(h1.weights.len(), 16);

    let out = net.layer(LayerId::Output).unwrap();
    assert_eq!(out.fan_in, 4);
    assert_eq!(out.activations.len(), 2);
    assert_eq!(out.weights.len(), 8);
}

#[test]
fn test_init_shapes_for_many_dimensions() {
    for inputs in 1..4 {
        for hidden in 1..4 {
            for layers in 1..4 {
                for outputs in 1..4 {
                    let dims = Dimensions::new(inputs, hidden, layers, outputs);
                    let net = heap_net::<Q15Profile>(dims);
                    for h in 0..layers {
                        let layer = net.layer(LayerId::Hidden(h)).unwrap();
                        let fan_in = if h == 0 { inputs } else { hidden };
                        assert_eq!(layer.fan_in, fan_in);
                        assert_eq!(layer.weights.len(), hidden * fan_in);
                    }
                    let out = net.layer(LayerId::Output).unwrap();
                    assert_eq!(out.weights.len(), outputs * hidden);
                }
            }
        }
    }
}

#[test]
fn test_init_rejects_zero_dimensions() {
    let cases = [
        Dimensions::new(0, 4, 1, 2),
        Dimensions::new(2, 0, 1, 2),
        Dimensions::new(2, 4, 0, 2),
        Dimensions::new(2, 4, 1, 0),
    ];
    for dims in cases {
        let mut allocation = Allocation::heap();
        let result = Network::<F32Profile>::new(dims, &mut allocation, &mut rng(0));
        assert_eq!(result.err(), Some(NetError::InvalidArgument));
    }
}

#[test]
fn test_init_rejects_fan_in_beyond_accumulator() {
    assert_eq!(Q7Profile::MAX_FAN_IN, 131_070);
    let dims = Dimensions::new(Q7Profile::MAX_FAN_IN + 1, 1, 1, 1);
    let mut allocation = Allocation::heap();
    let result = Network::<Q7Profile>::new(dims, &mut allocation, &mut rng(0));
    assert_eq!(result.err(), Some(NetError::InvalidArgument));
}

#[test]
fn test_init_rejects_dimensions_too_large_to_count() {
    let huge = usize::MAX / 2;
    let cases = [
        Dimensions::new(1, huge, 3, 1),
        Dimensions::new(huge, 4, 1, 1),
        Dimensions::new(1, 4, 1, huge),
        Dimensions::new(1, huge, huge, 1),
    ];
    for dims in cases {
        let mut allocation = Allocation::heap();
        let result = Network::<F32Profile>::new(dims, &mut allocation, &mut rng(0));
        assert!(matches!(result, Err(NetError::OutOfMemory { .. })), "{:?}", dims);
        assert!(matches!(dims.validate::<F32Profile>(), Err(NetError::OutOfMemory { .. })));
        assert_eq!(arena_bytes::<F32Profile>(&dims), usize::MAX);
    }

    let mut block = [0u8; 256];
    let mut allocation = Allocation::arena(&mut block);
    let dims = Dimensions::new(2, 4, 1, usize::MAX);
    let result = Network::<Q15Profile>::new(dims, &mut allocation, &mut rng(0));
    assert!(matches!(result, Err(NetError::OutOfMemory { .. })));
    assert_eq!(allocation.remaining(), Some(256));
}

#[test]
fn test_init_random_weights_in_unit_range() {
    let net = heap_net::<F32Profile>(DEFAULT_DIMENSIONS);
    for id in [LayerId::Hidden(0), LayerId::Hidden(4), LayerId::Output] {
        let layer = net.layer(id).unwrap();
        assert!(layer.weights.iter().all(|w| (-1.0..1.0).contains(w)));
        assert!(layer.biases.iter().all(|b| (-1.0..1.0).contains(b)));
    }
}

// =============================================================================
// Arena Strategy Tests
// =============================================================================

#[test]
fn test_arena_sized_from_dimensions() {
    const DIMS: Dimensions = DEFAULT_DIMENSIONS;
    let mut block = [0u8; arena_bytes::<Q7Profile>(&DIMS)];
    let mut allocation = Allocation::arena(&mut block);
    let net: Network<'_, Q7Profile> = Network::new(DIMS, &mut allocation, &mut rng(3)).unwrap();

    assert_eq!(net.strategy(), Strategy::Arena);
    assert_eq!(net.properties().num_layers, 7);
    assert!(allocation.remaining().is_some());
}

#[test]
fn test_arena_too_small() {
    let mut block = [0u8; 64];
    let mut allocation = Allocation::arena(&mut block);
    let result = Network::<F32Profile>::new(DEFAULT_DIMENSIONS, &mut allocation, &mut rng(3));
    assert!(matches!(result, Err(NetError::OutOfMemory { .. })));
}

#[test]
fn test_arena_allocations_are_aligned() {
    let mut buf = [0u8; 64];
    let mut arena = Arena::new(&mut buf);
    let _bytes = arena.alloc_slice::<u8>(3).unwrap();
    let words = arena.alloc_slice::<u32>(2).unwrap();
    assert_eq!(words.as_ptr() as usize % core::mem::align_of::<u32>(), 0);
    assert_eq!(words, &[0, 0]);
    assert!(arena.used() >= 11);
    assert_eq!(arena.used() + arena.remaining(), arena.capacity());
}

#[test]
fn test_arena_and_heap_agree() {
    const DIMS: Dimensions = Dimensions::new(4, 5, 3, 3);
    let mut block = [0u8; arena_bytes::<F32Profile>(&DIMS)];
    let mut arena = Allocation::arena(&mut block);
    let mut from_arena: Network<'_, F32Profile> =
        Network::new(DIMS, &mut arena, &mut rng(11)).unwrap();

    let mut heap = Allocation::heap();
    let mut from_heap: Network<'_, F32Profile> =
        Network::new(DIMS, &mut heap, &mut rng(11)).unwrap();

    let sample = [0.1f32, -0.4, 0.9, 0.3];
    from_arena.input_raw(&sample).unwrap();
    from_heap.input_raw(&sample).unwrap();

    assert_eq!(from_arena.classify().unwrap(), from_heap.classify().unwrap());
    assert_eq!(from_arena.output_activations(), from_heap.output_activations());
}

// =============================================================================
// Forward Propagation Tests
// =============================================================================

#[test]
fn test_forward_q7_known_values() {
    let mut net = heap_net::<Q7Profile>(Dimensions::new(2, 1, 1, 1));
    net.weights_mut(LayerId::Hidden(0)).unwrap().copy_from_slice(&[64, 64]);
    net.biases_mut(LayerId::Hidden(0)).unwrap().fill(0);
    net.weights_mut(LayerId::Output).unwrap().copy_from_slice(&[64]);
    net.biases_mut(LayerId::Output).unwrap().fill(0);

    // (10 + 20) * 1.0 → 30, then 30 * 1.0 → 30
    net.input_raw(&[10u8, 20]).unwrap();
    net.forward_propagate().unwrap();
    assert_eq!(net.activation(LayerId::Hidden(0), 0).unwrap(), 30);
    assert_eq!(net.output_activations(), &[30]);
}

#[test]
fn test_forward_q7_clamps() {
    let mut net = heap_net::<Q7Profile>(Dimensions::new(2, 2, 1, 1));
    net.weights_mut(LayerId::Hidden(0)).unwrap().copy_from_slice(&[127, 127, -128, -128]);
    net.biases_mut(LayerId::Hidden(0)).unwrap().fill(0);

    net.input_raw(&[127i8, 127]).unwrap();
    net.forward_propagate().unwrap();
    assert_eq!(net.activation(LayerId::Hidden(0), 0).unwrap(), 127);
    assert_eq!(net.activation(LayerId::Hidden(0), 1).unwrap(), 0);
}

#[test]
fn test_forward_f32_known_values() {
    let mut net = heap_net::<F32Profile>(Dimensions::new(1, 1, 1, 1));
    net.weights_mut(LayerId::Hidden(0)).unwrap()[0] = 0.5;
    net.biases_mut(LayerId::Hidden(0)).unwrap()[0] = 0.0;
    net.weights_mut(LayerId::Output).unwrap()[0] = 0.5;
    net.biases_mut(LayerId::Output).unwrap()[0] = 0.1;

    net.input_raw(&[0.5f32]).unwrap();
    net.forward_propagate().unwrap();

    let pi = core::f32::consts::PI;
    let hidden = (0.25 * pi).tanh();
    let output = ((0.5 * hidden + 0.1) * pi).tanh();
    assert!((net.activation(LayerId::Hidden(0), 0).unwrap() - hidden).abs() < 1e-6);
    assert!((net.output_activations()[0] - output).abs() < 1e-6);
}

#[test]
fn test_forward_is_deterministic() {
    let mut net = heap_net::<F32Profile>(DEFAULT_DIMENSIONS);
    let sample: [f32; 15] = core::array::from_fn(|i| i as f32 / 15.0);
    net.input_raw(&sample).unwrap();

    let first = net.classify().unwrap();
    let outputs = net.output_activations().to_vec();
    let second = net.classify().unwrap();
    assert_eq!(first, second);
    assert_eq!(outputs, net.output_activations());
    assert_eq!(net.network_response(), first);
}

#[test]
fn test_response_tie_goes_to_first() {
    let mut net = heap_net::<F32Profile>(Dimensions::new(1, 1, 1, 3));
    net.weights_mut(LayerId::Output).unwrap().fill(0.0);
    net.biases_mut(LayerId::Output).unwrap().copy_from_slice(&[0.0, 0.5, 0.5]);
    net.input_raw(&[1.0f32]).unwrap();
    assert_eq!(net.classify().unwrap(), 1);

    net.biases_mut(LayerId::Output).unwrap().fill(0.0);
    assert_eq!(net.classify().unwrap(), 0);
}

// =============================================================================
// Input Policy Tests
// =============================================================================

#[test]
fn test_input_length_must_match() {
    let mut net = heap_net::<F32Profile>(Dimensions::new(3, 2, 1, 2));
    assert_eq!(
        net.input_raw(&[1u8, 2]),
        Err(NetError::DimensionMismatch { expected: 3, actual: 2 })
    );
    assert_eq!(
        net.input_min_max_scale(&[1u8, 2, 3, 4], 0.0, 255.0),
        Err(NetError::DimensionMismatch { expected: 3, actual: 4 })
    );
}

#[test]
fn test_input_min_max_q15() {
    let mut net = heap_net::<Q15Profile>(Dimensions::new(3, 2, 1, 2));
    net.input_min_max_scale(&[0u8, 255, 51], 0.0, 255.0).unwrap();
    assert_eq!(net.input_activations(), &[0, i16::MAX, 6553]);
}

#[test]
fn test_input_min_max_rejects_empty_range() {
    let mut net = heap_net::<F32Profile>(Dimensions::new(2, 2, 1, 2));
    assert_eq!(net.input_min_max_scale(&[1u8, 2], 5.0, 5.0), Err(NetError::InvalidArgument));
    assert_eq!(net.input_min_max_scale(&[1u8, 2], 5.0, 1.0), Err(NetError::InvalidArgument));
}

#[test]
fn test_input_standardize() {
    let mut net = heap_net::<F32Profile>(Dimensions::new(2, 2, 1, 2));
    net.input_standardize_scale(&[30u16, 10], 20.0, 10.0).unwrap();
    assert_eq!(net.input_activations(), &[1.0, -1.0]);
    assert_eq!(
        net.input_standardize_scale(&[30u16, 10], 20.0, 0.0),
        Err(NetError::InvalidArgument)
    );
}

#[test]
fn test_input_histogram() {
    let mut net = heap_net::<F32Profile>(Dimensions::new(4, 2, 1, 2));
    // width 2.5: [0,1,2] | [3] | [] | [9,9,9,9]
    net.input_histogram(&[0u8, 1, 2, 3, 9, 9, 9, 9], 9.0).unwrap();
    assert_eq!(net.input_activations(), &[0.75, 0.25, 0.0, 1.0]);

    net.input_histogram(&[200u8, 250], 9.0).unwrap();
    assert_eq!(net.input_activations(), &[0.0; 4]);

    let empty: [u8; 0] = [];
    assert_eq!(net.input_histogram(&empty, 9.0), Err(NetError::InvalidArgument));
}

#[test]
fn test_input_histogram_counts_past_activation_range() {
    const DIMS: Dimensions = Dimensions::new(2, 2, 1, 2);
    let mut block = [0u8; arena_bytes::<Q7Profile>(&DIMS)];
    let mut allocation = Allocation::arena(&mut block);
    let mut net: Network<'_, Q7Profile> = Network::new(DIMS, &mut allocation, &mut rng(0)).unwrap();

    // 1000 readings in the upper bin, 500 in the lower; width 50.
    let mut readings = vec![80u16; 1000];
    readings.extend(core::iter::repeat(10u16).take(500));
    net.input_histogram(&readings, 99.0).unwrap();
    assert_eq!(net.input_activations(), &[64, 127]);

    // Bins start from zero on every call.
    net.input_histogram(&[10u16], 99.0).unwrap();
    assert_eq!(net.input_activations(), &[127, 0]);
}

#[test]
fn test_input_scaled_requires_resolved_policy() {
    let mut net = heap_net::<F32Profile>(Dimensions::new(2, 2, 1, 2));
    assert_eq!(
        net.input_scaled(&[1u8, 2], &InputScaling::StoreMinMax),
        Err(NetError::InvalidArgument)
    );
    net.input_scaled(&[0u8, 10], &InputScaling::MinMax { min: 0.0, max: 10.0 }).unwrap();
    assert_eq!(net.input_activations(), &[0.0, 1.0]);
}

// =============================================================================
// Diagnostic Accessor Tests
// =============================================================================

#[test]
fn test_accessors_out_of_range() {
    let net = heap_net::<F32Profile>(Dimensions::new(3, 4, 2, 2));

    assert_eq!(
        net.activation(LayerId::Output, 5).err(),
        Some(NetError::IndexOutOfRange { index: 5, len: 2 })
    );
    assert_eq!(
        net.layer(LayerId::Hidden(2)).err(),
        Some(NetError::IndexOutOfRange { index: 2, len: 2 })
    );
    assert_eq!(
        net.weight(LayerId::Hidden(0), 0, 3).err(),
        Some(NetError::IndexOutOfRange { index: 3, len: 3 })
    );
    assert_eq!(
        net.weight(LayerId::Hidden(1), 4, 0).err(),
        Some(NetError::IndexOutOfRange { index: 4, len: 4 })
    );
    assert_eq!(net.bias(LayerId::Input, 0).err(), Some(NetError::InvalidArgument));
}

#[test]
fn test_weight_accessor_is_row_major() {
    let mut net = heap_net::<F32Profile>(Dimensions::new(3, 2, 1, 1));
    net.weights_mut(LayerId::Hidden(0))
        .unwrap()
        .copy_from_slice(&[0.1, 0.2, 0.3, 0.4, 0.5, 0.6]);
    assert_eq!(net.weight(LayerId::Hidden(0), 1, 0).unwrap(), 0.4);
    assert_eq!(net.weight(LayerId::Hidden(0), 0, 2).unwrap(), 0.3);
}
