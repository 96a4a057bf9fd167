use std::collections::HashMap;

use prost::Message;
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{DescriptorProto, FieldDescriptorProto, FileDescriptorProto};

use webflux_generator::annotations::{
    HttpRule, RawCodeGeneratorRequest, RawFileDescriptor, RawMethod, RawMethodOptions, RawService,
    http_rule::Pattern,
};
use webflux_generator::generate_response;

fn scalar_field(name: &str, number: i32, r#type: Type, repeated: bool) -> FieldDescriptorProto {
    let label = if repeated { Label::Repeated } else { Label::Optional };
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(label as i32),
        r#type: Some(r#type as i32),
        ..Default::default()
    }
}

fn message(name: &str, fields: Vec<FieldDescriptorProto>) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_string()),
        field: fields,
        ..Default::default()
    }
}

fn rule(pattern: Pattern, body: &str) -> HttpRule {
    HttpRule {
        body: body.to_string(),
        pattern: Some(pattern),
        ..Default::default()
    }
}

fn raw_method(name: &str, input: &str, output: &str, http: Option<HttpRule>) -> RawMethod {
    RawMethod {
        name: Some(name.to_string()),
        input_type: Some(input.to_string()),
        output_type: Some(output.to_string()),
        options: http.map(|http| RawMethodOptions { http: Some(http) }),
        ..Default::default()
    }
}

/// Encode the descriptor and the service mirror back to back. Concatenated
/// encodings merge on decode, which is how the `google.api.http` extension
/// reaches the generator without descriptor-set plumbing.
fn file_bytes(descriptor: &FileDescriptorProto, services: &RawFileDescriptor) -> Vec<u8> {
    let mut bytes = descriptor.encode_to_vec();
    bytes.extend(services.encode_to_vec());
    bytes
}

/// One messages-only file plus one service file importing it.
fn echo_request(parameter: Option<&str>) -> RawCodeGeneratorRequest {
    let messages = FileDescriptorProto {
        name: Some("echo_messages.proto".to_string()),
        package: Some("com.example.echo".to_string()),
        message_type: vec![
            message(
                "EchoRequest",
                vec![
                    scalar_field("id", 1, Type::Int64, false),
                    scalar_field("note", 2, Type::String, false),
                    scalar_field("tags", 3, Type::String, true),
                ],
            ),
            message("EchoResponse", vec![scalar_field("text", 1, Type::String, false)]),
        ],
        syntax: Some("proto3".to_string()),
        ..Default::default()
    };

    let service_file = FileDescriptorProto {
        name: Some("echo_service.proto".to_string()),
        package: Some("com.example.echo".to_string()),
        dependency: vec!["echo_messages.proto".to_string()],
        syntax: Some("proto3".to_string()),
        ..Default::default()
    };
    let mut update = rule(Pattern::Put("/v1/echo/{id}".to_string()), "*");
    update.additional_bindings = vec![rule(Pattern::Post("/v1/echo".to_string()), "*")];
    let services = RawFileDescriptor {
        name: Some("echo_service.proto".to_string()),
        service: vec![RawService {
            name: Some("EchoService".to_string()),
            method: vec![
                raw_method(
                    "GetEcho",
                    ".com.example.echo.EchoRequest",
                    ".com.example.echo.EchoResponse",
                    Some(rule(Pattern::Get("/v1/echo/{id}".to_string()), "")),
                ),
                raw_method(
                    "UpdateEcho",
                    ".com.example.echo.EchoRequest",
                    ".com.example.echo.EchoResponse",
                    Some(update),
                ),
                raw_method(
                    "ListEchoes",
                    ".com.example.echo.EchoRequest",
                    ".com.example.echo.EchoResponse",
                    None,
                ),
            ],
        }],
    };

    RawCodeGeneratorRequest {
        file_to_generate: vec!["echo_service.proto".to_string()],
        parameter: parameter.map(str::to_string),
        proto_file: vec![
            messages.encode_to_vec(),
            file_bytes(&service_file, &services),
        ],
    }
}

fn generated_files(request: &RawCodeGeneratorRequest) -> HashMap<String, String> {
    let response = generate_response(&request.encode_to_vec()).expect("generation should succeed");
    assert_eq!(response.error, None);
    response
        .file
        .into_iter()
        .map(|f| (f.name.unwrap_or_default(), f.content.unwrap_or_default()))
        .collect()
}

#[test]
fn e2e_rest_style_generates_transcoding_handlers() {
    let map = generated_files(&echo_request(Some("style=rest")));

    // Only the requested file produces output, one class per service.
    assert_eq!(map.len(), 1, "unexpected extra files generated");
    let src = map
        .get("com/example/echo/EchoServiceRest.java")
        .expect("missing generated service class");

    assert!(src.contains("package com.example.echo;"));
    assert!(src.contains("public class EchoServiceRest"));

    // GET binding: path variable converted, free fields through the query.
    assert!(src.contains("public static final String GET_ECHO_PATH = \"/v1/echo/{id}\";"));
    assert!(src.contains("public Mono<EchoResponse> getEcho(ServerRequest request)"));
    assert!(src.contains("builder.setId(Long.valueOf(request.pathVariable(\"id\")));"));
    assert!(src.contains(
        "request.queryParam(\"note\").filter(value -> !value.isEmpty()).ifPresent(value -> builder.setNote(value));"
    ));
    assert!(src.contains(
        "request.queryParams().getOrDefault(\"tags\", List.of()).forEach(value -> builder.addTags(value));"
    ));

    // PUT binding merges the whole body; no query steps alongside it.
    assert!(src.contains("public Mono<EchoResponse> updateEcho(ServerRequest request)"));
    assert!(src.contains("JsonFormat.parser().merge(body, builder);"));
    let update = &src[src.find("updateEcho(").expect("handler")..];
    let update = &update[..update.find("updateEcho0(").expect("additional handler")];
    assert!(!update.contains("queryParam"));

    // The additional binding fans out under an indexed name but delegates to
    // the same service method.
    assert!(src.contains("public static final String UPDATE_ECHO0_PATH = \"/v1/echo\";"));
    assert!(src.contains("public Mono<EchoResponse> updateEcho0(ServerRequest request)"));
    assert_eq!(src.matches("return service.updateEcho(builder.build());").count(), 2);

    // A method without a rule falls back to the RPC-shaped default.
    assert!(src.contains(
        "public static final String LIST_ECHOES_PATH = \"/EchoService/listEchoes\";"
    ));
}

#[test]
fn e2e_default_style_ignores_annotations() {
    let map = generated_files(&echo_request(None));
    let src = map
        .get("com/example/echo/EchoServiceRest.java")
        .expect("missing generated service class");

    // Every method gets exactly one POST binding under the rpc route.
    assert!(src.contains("public static final String GET_ECHO_PATH = \"/EchoService/getEcho\";"));
    assert!(src.contains(
        "public static final String UPDATE_ECHO_PATH = \"/EchoService/updateEcho\";"
    ));
    assert!(!src.contains("UPDATE_ECHO0_PATH"));
    assert!(!src.contains("queryParam"));
    assert_eq!(src.matches("JsonFormat.parser().merge(body, builder);").count(), 3);
}

#[test]
fn e2e_invalid_binding_surfaces_as_error() {
    let mut request = echo_request(Some("style=rest"));
    // Rebuild the service file with a template variable that names no field.
    let service_file = FileDescriptorProto {
        name: Some("echo_service.proto".to_string()),
        package: Some("com.example.echo".to_string()),
        dependency: vec!["echo_messages.proto".to_string()],
        syntax: Some("proto3".to_string()),
        ..Default::default()
    };
    let services = RawFileDescriptor {
        name: Some("echo_service.proto".to_string()),
        service: vec![RawService {
            name: Some("EchoService".to_string()),
            method: vec![raw_method(
                "GetEcho",
                ".com.example.echo.EchoRequest",
                ".com.example.echo.EchoResponse",
                Some(rule(Pattern::Get("/v1/echo/{nope}".to_string()), "")),
            )],
        }],
    };
    request.proto_file[1] = file_bytes(&service_file, &services);

    let err = generate_response(&request.encode_to_vec()).expect_err("should fail");
    let message = err.to_string();
    assert!(message.contains("echo_service.proto"), "{message}");
    assert!(message.contains("nope"), "{message}");
}
