//! Integration tests for protoc-gen-gateway-ts
//!
//! These tests exercise the full code generation pipeline.

use prost_types::compiler::code_generator_response::Feature;
use prost_types::compiler::CodeGeneratorRequest;
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{
    DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
    FileDescriptorProto, MessageOptions, MethodDescriptorProto, OneofDescriptorProto,
    ServiceDescriptorProto,
};

fn scalar_field(name: &str, number: i32, scalar: Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        r#type: Some(scalar.into()),
        ..Default::default()
    }
}

fn message_field(name: &str, number: i32, type_name: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        r#type: Some(Type::Message.into()),
        type_name: Some(type_name.to_string()),
        ..Default::default()
    }
}

fn request_for(
    files: Vec<FileDescriptorProto>,
    to_generate: Vec<&str>,
) -> CodeGeneratorRequest {
    CodeGeneratorRequest {
        file_to_generate: to_generate.into_iter().map(str::to_string).collect(),
        proto_file: files,
        ..Default::default()
    }
}

fn content_of<'a>(
    response: &'a prost_types::compiler::CodeGeneratorResponse,
    name: &str,
) -> &'a str {
    response
        .file
        .iter()
        .find(|f| f.name.as_deref() == Some(name))
        .unwrap_or_else(|| panic!("no generated file named {}", name))
        .content
        .as_deref()
        .unwrap()
}

#[test]
fn test_nested_declarations_render_with_composite_names() {
    let file = FileDescriptorProto {
        name: Some("a.proto".to_string()),
        package: Some("p".to_string()),
        message_type: vec![DescriptorProto {
            name: Some("Outer".to_string()),
            nested_type: vec![DescriptorProto {
                name: Some("Inner".to_string()),
                enum_type: vec![EnumDescriptorProto {
                    name: Some("E".to_string()),
                    value: vec![EnumValueDescriptorProto {
                        name: Some("X".to_string()),
                        number: Some(0),
                        ..Default::default()
                    }],
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        }],
        ..Default::default()
    };

    let response =
        protoc_gen_gateway_ts::generate(request_for(vec![file], vec!["a.proto"])).unwrap();

    assert!(response.error.is_none());
    let content = content_of(&response, "a.pb.ts");
    assert!(content.contains("export enum OuterInnerE {"));
    assert!(content.contains("  X = \"X\","));
    assert!(content.contains("export type OuterInner = {"));
    assert!(content.contains("export type Outer = {"));
}

#[test]
fn test_enum_alias_values_render_by_name() {
    let file = FileDescriptorProto {
        name: Some("alias.proto".to_string()),
        package: Some("p".to_string()),
        enum_type: vec![EnumDescriptorProto {
            name: Some("Mode".to_string()),
            value: vec![
                EnumValueDescriptorProto {
                    name: Some("MODE_UNKNOWN".to_string()),
                    number: Some(0),
                    ..Default::default()
                },
                EnumValueDescriptorProto {
                    name: Some("MODE_DEFAULT".to_string()),
                    number: Some(0),
                    ..Default::default()
                },
            ],
            ..Default::default()
        }],
        ..Default::default()
    };

    let response =
        protoc_gen_gateway_ts::generate(request_for(vec![file], vec!["alias.proto"])).unwrap();

    let content = content_of(&response, "alias.pb.ts");
    assert!(content.contains("MODE_UNKNOWN = \"MODE_UNKNOWN\","));
    assert!(content.contains("MODE_DEFAULT = \"MODE_DEFAULT\","));
}

#[test]
fn test_one_of_groups_render_as_intersection() {
    let file = FileDescriptorProto {
        name: Some("o.proto".to_string()),
        package: Some("p".to_string()),
        message_type: vec![DescriptorProto {
            name: Some("M".to_string()),
            field: vec![
                FieldDescriptorProto {
                    oneof_index: Some(0),
                    ..scalar_field("a", 1, Type::String)
                },
                scalar_field("b", 2, Type::String),
                FieldDescriptorProto {
                    oneof_index: Some(0),
                    ..scalar_field("c", 3, Type::String)
                },
            ],
            oneof_decl: vec![OneofDescriptorProto {
                name: Some("choice".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        }],
        ..Default::default()
    };

    let response =
        protoc_gen_gateway_ts::generate(request_for(vec![file], vec!["o.proto"])).unwrap();

    let content = content_of(&response, "o.pb.ts");
    // support types come along exactly when a one-of exists
    assert!(content.contains("type OneOf<T> ="));
    assert!(content.contains("type BaseM = {"));
    assert!(content.contains("  b?: string;"));
    assert!(!content.contains("  a?: string;"), "a is not a plain field");
    assert!(content.contains("export type M = BaseM\n  & OneOf<{ a: string; c: string }>"));
}

#[test]
fn test_repeated_scalar_and_map_round_trip() {
    let file = FileDescriptorProto {
        name: Some("m.proto".to_string()),
        package: Some("p".to_string()),
        message_type: vec![DescriptorProto {
            name: Some("Holder".to_string()),
            field: vec![
                FieldDescriptorProto {
                    label: Some(Label::Repeated.into()),
                    ..scalar_field("sizes", 1, Type::Int32)
                },
                FieldDescriptorProto {
                    label: Some(Label::Repeated.into()),
                    ..message_field("counts", 2, ".p.Holder.CountsEntry")
                },
            ],
            nested_type: vec![DescriptorProto {
                name: Some("CountsEntry".to_string()),
                field: vec![
                    scalar_field("key", 1, Type::String),
                    scalar_field("value", 2, Type::Int64),
                ],
                options: Some(MessageOptions {
                    map_entry: Some(true),
                    ..Default::default()
                }),
                ..Default::default()
            }],
            ..Default::default()
        }],
        ..Default::default()
    };

    let response =
        protoc_gen_gateway_ts::generate(request_for(vec![file], vec!["m.proto"])).unwrap();

    let content = content_of(&response, "m.pb.ts");
    assert!(content.contains("  sizes?: number[];"));
    // 64 bit values serialize as strings, so the map value side does too
    assert!(content.contains("  counts?: {[key: string]: string};"));
    // the synthetic entry is never rendered as a type of its own
    assert!(!content.contains("CountsEntry"));
}

#[test]
fn test_well_known_types_have_fixed_mappings() {
    let file = FileDescriptorProto {
        name: Some("wk.proto".to_string()),
        package: Some("p".to_string()),
        message_type: vec![DescriptorProto {
            name: Some("WellKnown".to_string()),
            field: vec![
                message_field("timestamp", 1, ".google.protobuf.Timestamp"),
                message_field("duration", 2, ".google.protobuf.Duration"),
                message_field("struct", 3, ".google.protobuf.Struct"),
                message_field("list_value", 4, ".google.protobuf.ListValue"),
                FieldDescriptorProto {
                    r#type: Some(Type::Enum.into()),
                    ..message_field("null_value", 5, ".google.protobuf.NullValue")
                },
                message_field("field_mask", 6, ".google.protobuf.FieldMask"),
                message_field("any", 7, ".google.protobuf.Any"),
                message_field("empty", 8, ".google.protobuf.Empty"),
            ],
            ..Default::default()
        }],
        ..Default::default()
    };

    let response =
        protoc_gen_gateway_ts::generate(request_for(vec![file], vec!["wk.proto"])).unwrap();

    let content = content_of(&response, "wk.pb.ts");
    assert!(content.contains("  timestamp?: string;"));
    assert!(content.contains("  duration?: string;"));
    assert!(content.contains("  struct?: unknown;"));
    assert!(content.contains("  listValue?: unknown[];"));
    assert!(content.contains("  nullValue?: null;"));
    assert!(content.contains("  fieldMask?: string[];"));
    assert!(content.contains("  any?: unknown;"));
    assert!(content.contains("  empty?: {};"));
    // well-known types never become imports
    assert!(!content.contains("import"));
}

#[test]
fn test_same_package_cross_file_reference_becomes_one_import() {
    let x = FileDescriptorProto {
        name: Some("x.proto".to_string()),
        package: Some("p".to_string()),
        message_type: vec![DescriptorProto {
            name: Some("A".to_string()),
            field: vec![
                message_field("first", 1, ".p.B"),
                message_field("second", 2, ".p.B"),
            ],
            ..Default::default()
        }],
        ..Default::default()
    };
    let y = FileDescriptorProto {
        name: Some("y.proto".to_string()),
        package: Some("p".to_string()),
        message_type: vec![DescriptorProto {
            name: Some("B".to_string()),
            field: vec![scalar_field("id", 1, Type::String)],
            ..Default::default()
        }],
        ..Default::default()
    };

    let response = protoc_gen_gateway_ts::generate(request_for(
        vec![x, y],
        vec!["x.proto", "y.proto"],
    ))
    .unwrap();

    let content = content_of(&response, "x.pb.ts");
    assert_eq!(
        content.matches("import * as PY from \"./y.pb\"").count(),
        1,
        "two references to the same foreign file collapse to one import"
    );
    assert!(content.contains("  first?: PY.B;"));
    assert!(content.contains("  second?: PY.B;"));
}

#[test]
fn test_files_not_to_generate_resolve_references_but_emit_nothing() {
    let imported = FileDescriptorProto {
        name: Some("lib/common.proto".to_string()),
        package: Some("common".to_string()),
        message_type: vec![DescriptorProto {
            name: Some("Shared".to_string()),
            ..Default::default()
        }],
        ..Default::default()
    };
    let main = FileDescriptorProto {
        name: Some("app.proto".to_string()),
        package: Some("app".to_string()),
        dependency: vec!["lib/common.proto".to_string()],
        message_type: vec![DescriptorProto {
            name: Some("Holder".to_string()),
            field: vec![message_field("shared", 1, ".common.Shared")],
            ..Default::default()
        }],
        ..Default::default()
    };

    let response = protoc_gen_gateway_ts::generate(request_for(
        vec![imported, main],
        vec!["app.proto"],
    ))
    .unwrap();

    assert_eq!(response.file.len(), 1, "only the designated file is emitted");
    let content = content_of(&response, "app.pb.ts");
    assert!(content.contains("import * as CommonCommon from \"./lib/common.pb\""));
    assert!(content.contains("  shared?: CommonCommon.Shared;"));
}

#[test]
fn test_service_renders_client_and_fetch_module_once() {
    let file = FileDescriptorProto {
        name: Some("svc.proto".to_string()),
        package: Some("p".to_string()),
        message_type: vec![
            DescriptorProto {
                name: Some("Req".to_string()),
                field: vec![scalar_field("counter", 1, Type::Int32)],
                ..Default::default()
            },
            DescriptorProto {
                name: Some("Resp".to_string()),
                field: vec![scalar_field("result", 1, Type::Int32)],
                ..Default::default()
            },
        ],
        service: vec![ServiceDescriptorProto {
            name: Some("Counter".to_string()),
            method: vec![
                MethodDescriptorProto {
                    name: Some("Increment".to_string()),
                    input_type: Some(".p.Req".to_string()),
                    output_type: Some(".p.Resp".to_string()),
                    ..Default::default()
                },
                MethodDescriptorProto {
                    name: Some("Watch".to_string()),
                    input_type: Some(".p.Req".to_string()),
                    output_type: Some(".p.Resp".to_string()),
                    server_streaming: Some(true),
                    ..Default::default()
                },
                MethodDescriptorProto {
                    name: Some("Upload".to_string()),
                    input_type: Some(".p.Req".to_string()),
                    output_type: Some(".p.Resp".to_string()),
                    client_streaming: Some(true),
                    ..Default::default()
                },
            ],
            ..Default::default()
        }],
        ..Default::default()
    };

    let response =
        protoc_gen_gateway_ts::generate(request_for(vec![file], vec!["svc.proto"])).unwrap();

    assert_eq!(response.file.len(), 2, "service file plus fetch module");
    let content = content_of(&response, "svc.pb.ts");

    assert!(content.contains("import * as fm from \"./fetch.pb\""));
    assert!(content.contains("export class Counter {"));
    assert!(content.contains(
        "  static Increment(req: Req, initReq?: fm.InitReq): Promise<Resp> {"
    ));
    assert!(content.contains(
        "return fm.fetchReq<Req, Resp>(`/p.Counter/Increment`, {...initReq, method: \"POST\", body: JSON.stringify(req)})"
    ));
    assert!(content.contains(
        "  static Watch(req: Req, entityNotifier?: fm.NotifyStreamEntityArrival<Resp>, initReq?: fm.InitReq): Promise<void> {"
    ));
    assert!(content.contains("fm.fetchStreamingRequest<Req, Resp>(`/p.Counter/Watch`"));
    // client streaming methods disappear
    assert!(!content.contains("Upload"));

    let fetch = content_of(&response, "fetch.pb.ts");
    assert!(fetch.contains("export function fetchReq"));
}

#[test]
fn test_no_services_means_no_fetch_module() {
    let file = FileDescriptorProto {
        name: Some("plain.proto".to_string()),
        package: Some("p".to_string()),
        message_type: vec![DescriptorProto {
            name: Some("M".to_string()),
            field: vec![scalar_field("v", 1, Type::String)],
            ..Default::default()
        }],
        ..Default::default()
    };

    let response =
        protoc_gen_gateway_ts::generate(request_for(vec![file], vec!["plain.proto"])).unwrap();

    assert_eq!(response.file.len(), 1);
    assert_eq!(response.file[0].name.as_deref(), Some("plain.pb.ts"));
}

#[test]
fn test_empty_file_renders_placeholder() {
    let file = FileDescriptorProto {
        name: Some("empty.proto".to_string()),
        package: Some("p".to_string()),
        ..Default::default()
    };

    let response =
        protoc_gen_gateway_ts::generate(request_for(vec![file], vec!["empty.proto"])).unwrap();

    assert_eq!(content_of(&response, "empty.pb.ts"), "export default {}");
}

#[test]
fn test_field_naming_convention_toggle() {
    let file = || FileDescriptorProto {
        name: Some("n.proto".to_string()),
        package: Some("p".to_string()),
        message_type: vec![DescriptorProto {
            name: Some("M".to_string()),
            field: vec![scalar_field("item_id", 1, Type::String)],
            ..Default::default()
        }],
        ..Default::default()
    };

    let camel =
        protoc_gen_gateway_ts::generate(request_for(vec![file()], vec!["n.proto"])).unwrap();
    assert!(content_of(&camel, "n.pb.ts").contains("  itemId?: string;"));

    let mut request = request_for(vec![file()], vec!["n.proto"]);
    request.parameter = Some("use_proto_names=true".to_string());
    let verbatim = protoc_gen_gateway_ts::generate(request).unwrap();
    assert!(content_of(&verbatim, "n.pb.ts").contains("  item_id?: string;"));
}

#[test]
fn test_styling_check_toggles_suppression_header() {
    let file = || FileDescriptorProto {
        name: Some("s.proto".to_string()),
        package: Some("p".to_string()),
        message_type: vec![DescriptorProto {
            name: Some("M".to_string()),
            field: vec![scalar_field("v", 1, Type::String)],
            ..Default::default()
        }],
        ..Default::default()
    };

    let default =
        protoc_gen_gateway_ts::generate(request_for(vec![file()], vec!["s.proto"])).unwrap();
    assert!(content_of(&default, "s.pb.ts").starts_with("/* eslint-disable */"));

    let mut request = request_for(vec![file()], vec!["s.proto"]);
    request.parameter = Some("enable_styling_check=true".to_string());
    let checked = protoc_gen_gateway_ts::generate(request).unwrap();
    assert!(!content_of(&checked, "s.pb.ts").contains("eslint-disable"));
}

#[test]
fn test_bad_parameter_aborts_generation() {
    let file = FileDescriptorProto {
        name: Some("x.proto".to_string()),
        package: Some("p".to_string()),
        ..Default::default()
    };
    let mut request = request_for(vec![file], vec!["x.proto"]);
    request.parameter = Some("loglevel=loud".to_string());

    assert!(protoc_gen_gateway_ts::generate(request).is_err());
}

#[test]
fn test_generation_is_idempotent() {
    let file = || FileDescriptorProto {
        name: Some("x.proto".to_string()),
        package: Some("p".to_string()),
        message_type: vec![DescriptorProto {
            name: Some("A".to_string()),
            field: vec![
                message_field("b", 1, ".p.B"),
                FieldDescriptorProto {
                    label: Some(Label::Repeated.into()),
                    ..scalar_field("ids", 2, Type::Int64)
                },
            ],
            ..Default::default()
        }],
        ..Default::default()
    };
    let other = || FileDescriptorProto {
        name: Some("y.proto".to_string()),
        package: Some("p".to_string()),
        message_type: vec![DescriptorProto {
            name: Some("B".to_string()),
            ..Default::default()
        }],
        service: vec![ServiceDescriptorProto {
            name: Some("Svc".to_string()),
            method: vec![MethodDescriptorProto {
                name: Some("Get".to_string()),
                input_type: Some(".p.A".to_string()),
                output_type: Some(".p.B".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        }],
        ..Default::default()
    };

    let run = || {
        protoc_gen_gateway_ts::generate(request_for(
            vec![file(), other()],
            vec!["x.proto", "y.proto"],
        ))
        .unwrap()
    };

    let first = run();
    let second = run();

    assert_eq!(first.file.len(), second.file.len());
    for (a, b) in first.file.iter().zip(second.file.iter()) {
        assert_eq!(a.name, b.name);
        assert_eq!(a.content, b.content);
    }
}

#[test]
fn test_response_advertises_proto3_optional() {
    let file = FileDescriptorProto {
        name: Some("x.proto".to_string()),
        package: Some("p".to_string()),
        ..Default::default()
    };
    let response =
        protoc_gen_gateway_ts::generate(request_for(vec![file], vec!["x.proto"])).unwrap();

    assert_eq!(
        response.supported_features,
        Some(Feature::Proto3Optional as u64)
    );
}
