use crate::{CascadeConfig, CascadeError, EdCoderConfig, STAGE_INPUT_CHANNELS};
use burn::{backend::NdArray, config::Config};

type TestBackend = NdArray<f32>;

#[test]
fn test_valid_configuration() {
    let config = CascadeConfig::new()
        .with_num_resblocks([1, 2, 3, 4])
        .with_input_channels([3, 6, 6, 6]);

    assert!(config.validate().is_ok());
}

#[test]
fn test_wrong_stage_input_channels() {
    for input_channels in [[3, 3, 3, 3], [6, 6, 6, 6], [3, 6, 6, 9]] {
        let config = CascadeConfig::new().with_input_channels(input_channels);

        match config.validate() {
            Err(CascadeError::InvalidConfiguration { reason }) => {
                assert!(reason.contains("input_channels must be [3, 6, 6, 6]"));
            }
            _ => panic!("Expected InvalidConfiguration error"),
        }
    }
}

#[test]
fn test_init_rejects_invalid_configuration() {
    let result = CascadeConfig::new()
        .with_input_channels([3, 3, 6, 6])
        .init::<TestBackend>(&Default::default());

    assert!(matches!(
        result,
        Err(CascadeError::InvalidConfiguration { .. })
    ));
}

#[test]
fn test_stage_configurations() {
    let config = CascadeConfig::new().with_num_resblocks([1, 2, 3, 4]);

    for (index, stage) in config.stages().iter().enumerate() {
        assert_eq!(stage.level, index + 1);
        assert_eq!(stage.num_resblocks, index + 1);
        assert_eq!(stage.input_channels, STAGE_INPUT_CHANNELS[index]);
    }
}

#[test]
fn test_fusion_channel_accumulation() {
    let config = CascadeConfig::new();

    assert_eq!(config.stage(0).fusion_channels(), 0);
    assert_eq!(config.stage(1).fusion_channels(), 128);
    assert_eq!(config.stage(2).fusion_channels(), 256);
    assert_eq!(config.stage(3).fusion_channels(), 384);
}

#[test]
fn test_edcoder_zero_input_channels() {
    let config = EdCoderConfig::new(2).with_input_channels(0);

    match config.validate() {
        Err(CascadeError::InvalidConfiguration { reason }) => {
            assert!(reason.contains("zero input channels"));
        }
        _ => panic!("Expected InvalidConfiguration error"),
    }
}

#[test]
fn test_config_json_round_trip() {
    let config = CascadeConfig::new().with_num_resblocks([2, 3, 4, 5]);

    let json = config.to_string();
    let restored = CascadeConfig::load_binary(json.as_bytes()).unwrap();

    assert_eq!(restored.num_resblocks, [2, 3, 4, 5]);
    assert_eq!(restored.input_channels, [3, 6, 6, 6]);
}

#[test]
fn test_error_messages() {
    let error = CascadeError::InvalidTensorShape {
        expected: "[B, 3, H, W]".to_string(),
        actual: "[1, 4, 8, 8]".to_string(),
    };
    assert_eq!(
        error.to_string(),
        "Invalid input tensor shape: expected [B, 3, H, W], got [1, 4, 8, 8]"
    );

    let error = CascadeError::UnexpectedFusionFeature { level: 1 };
    assert_eq!(
        error.to_string(),
        "Stage at level 1 has no fusion block but received a fusion feature"
    );
}
