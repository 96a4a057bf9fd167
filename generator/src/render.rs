//! Rendering route bindings into Java WebFlux handler sources.
//!
//! Purely textual: consumes the structured bindings and plans, produces one
//! `{Service}Rest.java` per service. No descriptor lookups happen here.

use heck::ToUpperCamelCase;

use crate::method::Binding;
use crate::plan::{Conversion, TranscodeStep};
use crate::registry::{MethodType, ServiceDescriptor};

/// Render one service class. Returns `(relative_file_path, file_content)`;
/// the path uses '/' separators and includes the package directories.
pub fn render_service(service: &ServiceDescriptor, bindings: &[Binding]) -> (String, String) {
    let file_name = format!("{}Rest.java", service.name);
    let rel = if service.package.is_empty() {
        file_name
    } else {
        format!("{}/{}", service.package.replace('.', "/"), file_name)
    };
    (rel, render_class(service, bindings))
}

fn render_class(service: &ServiceDescriptor, bindings: &[Binding]) -> String {
    let mut s = String::new();
    if !service.package.is_empty() {
        s.push_str(&format!("package {};\n\n", service.package));
    }
    s.push_str(&render_imports(bindings));

    if !service.comment.is_empty() {
        s.push_str(&render_javadoc(&service.comment, ""));
    }
    s.push_str(&format!("public class {}Rest {{\n", service.name));

    for binding in bindings {
        s.push_str(&format!(
            "    public static final String {} = \"{}\";\n",
            binding.path_const(),
            binding.route_path
        ));
    }
    s.push('\n');

    s.push_str(&format!("    private final {} service;\n\n", service.name));
    s.push_str(&format!(
        "    public {name}Rest({name} service) {{ this.service = service; }}\n",
        name = service.name
    ));

    for binding in bindings {
        s.push('\n');
        s.push_str(&render_handler(binding));
    }

    s.push_str("}\n");
    s
}

fn render_imports(bindings: &[Binding]) -> String {
    let mut s = String::new();
    s.push_str("import org.springframework.web.reactive.function.server.ServerRequest;\n");
    s.push_str("import reactor.core.publisher.Mono;\n");
    if bindings.iter().any(|b| returns_flux(b.method_type)) {
        s.push_str("import reactor.core.publisher.Flux;\n");
    }
    if bindings.iter().any(has_body_step) {
        s.push_str("import com.google.protobuf.InvalidProtocolBufferException;\n");
        s.push_str("import com.google.protobuf.util.JsonFormat;\n");
    }
    if bindings.iter().any(|b| uses_conversion(b, is_timestamp)) {
        s.push_str("import com.google.protobuf.util.Timestamps;\n");
    }
    if bindings.iter().any(|b| uses_conversion(b, is_duration)) {
        s.push_str("import com.google.protobuf.util.Durations;\n");
    }
    if bindings.iter().any(|b| uses_conversion(b, is_field_mask)) {
        s.push_str("import com.google.protobuf.util.FieldMaskUtil;\n");
    }
    if bindings
        .iter()
        .any(|b| b.plan.steps.iter().any(|s| matches!(s, TranscodeStep::SetFromQuery { repeated: true, .. })))
    {
        s.push_str("import java.util.List;\n");
    }
    s.push('\n');
    s
}

fn render_handler(binding: &Binding) -> String {
    let mut s = String::new();
    if !binding.comment.is_empty() {
        s.push_str(&render_javadoc(&binding.comment, "    "));
    }
    let input = simple_name(&binding.input_type);
    let output = simple_name(&binding.output_type);
    let wrapper = if returns_flux(binding.method_type) { "Flux" } else { "Mono" };

    s.push_str(&format!(
        "    // {} {}\n",
        binding.verb.as_str(),
        binding.route_path
    ));
    s.push_str(&format!(
        "    public {wrapper}<{output}> {}(ServerRequest request) {{\n",
        binding.route_name
    ));

    if has_body_step(binding) {
        s.push_str(&format!(
            "        return request.bodyToMono(String.class).defaultIfEmpty(\"\").flatMap{}(body -> {{\n",
            if returns_flux(binding.method_type) { "Many" } else { "" }
        ));
        s.push_str(&format!(
            "            {input}.Builder builder = {input}.newBuilder();\n"
        ));
        s.push_str("            try {\n");
        for step in &binding.plan.steps {
            match step {
                TranscodeStep::MergeWholeBody => {
                    s.push_str("                JsonFormat.parser().merge(body, builder);\n");
                }
                TranscodeStep::SetFromBodyField { field, .. } => {
                    s.push_str(&format!(
                        "                JsonFormat.parser().merge(body, builder.get{}Builder());\n",
                        field.to_upper_camel_case()
                    ));
                }
                _ => {}
            }
        }
        s.push_str("            } catch (InvalidProtocolBufferException e) {\n");
        s.push_str(&format!(
            "                return {wrapper}.error(e);\n"
        ));
        s.push_str("            }\n");
        for step in &binding.plan.steps {
            if let Some(line) = render_step(step) {
                s.push_str(&format!("            {line}\n"));
            }
        }
        s.push_str(&format!(
            "            return service.{}(builder.build());\n",
            binding.route_name_base()
        ));
        s.push_str("        });\n");
    } else {
        s.push_str(&format!(
            "        {input}.Builder builder = {input}.newBuilder();\n"
        ));
        for step in &binding.plan.steps {
            if let Some(line) = render_step(step) {
                s.push_str(&format!("        {line}\n"));
            }
        }
        s.push_str(&format!(
            "        return service.{}(builder.build());\n",
            binding.route_name_base()
        ));
    }

    s.push_str("    }\n");
    s
}

/// The statement for one path or query step; body steps render inline in the
/// handler and return `None` here.
fn render_step(step: &TranscodeStep) -> Option<String> {
    match step {
        TranscodeStep::SetFromPath {
            path,
            variable,
            conversion,
        } => {
            let value = convert_value(conversion, &format!("request.pathVariable(\"{variable}\")"));
            Some(format!("{};", setter_chain(path, &format!("set{}({value})", last_upper(path)))))
        }
        TranscodeStep::SetFromQuery {
            path,
            variable: _,
            conversion,
            repeated,
        } => {
            let name = path.join(".");
            if *repeated {
                let value = convert_value(conversion, "value");
                Some(format!(
                    "request.queryParams().getOrDefault(\"{name}\", List.of()).forEach(value -> {});",
                    setter_chain(path, &format!("add{}({value})", last_upper(path)))
                ))
            } else {
                let value = convert_value(conversion, "value");
                Some(format!(
                    "request.queryParam(\"{name}\").filter(value -> !value.isEmpty()).ifPresent(value -> {});",
                    setter_chain(path, &format!("set{}({value})", last_upper(path)))
                ))
            }
        }
        TranscodeStep::SetFromBodyField { .. } | TranscodeStep::MergeWholeBody => None,
    }
}

/// `builder.getFooBuilder().getBarBuilder().<terminal>` for a nested path,
/// plain `builder.<terminal>` for a top-level field.
fn setter_chain(path: &[String], terminal: &str) -> String {
    let mut s = String::from("builder");
    for parent in &path[..path.len() - 1] {
        s.push_str(&format!(".get{}Builder()", parent.to_upper_camel_case()));
    }
    s.push_str(&format!(".{terminal}"));
    s
}

fn last_upper(path: &[String]) -> String {
    path.last().map(|p| p.to_upper_camel_case()).unwrap_or_default()
}

fn convert_value(conversion: &Conversion, value: &str) -> String {
    match conversion {
        Conversion::Identity => value.to_string(),
        Conversion::Bool => format!("Boolean.valueOf({value})"),
        Conversion::Int32 => format!("Integer.valueOf({value})"),
        Conversion::Int64 => format!("Long.valueOf({value})"),
        Conversion::Uint32 => format!("Integer.parseUnsignedInt({value})"),
        Conversion::Uint64 => format!("Long.parseUnsignedLong({value})"),
        Conversion::Float => format!("Float.valueOf({value})"),
        Conversion::Double => format!("Double.valueOf({value})"),
        Conversion::EnumValue(name) => format!("{}.valueOf({value})", simple_name(name)),
        Conversion::WellKnownString(name) if is_timestamp(name) => {
            format!("Timestamps.parseUnchecked({value})")
        }
        Conversion::WellKnownString(name) if is_duration(name) => {
            format!("Durations.parseUnchecked({value})")
        }
        Conversion::WellKnownString(_) => format!("FieldMaskUtil.fromString({value})"),
    }
}

fn render_javadoc(comment: &str, indent: &str) -> String {
    let mut s = format!("{indent}/**\n");
    for line in comment.lines() {
        s.push_str(&format!("{indent} * {}\n", line.trim()));
    }
    s.push_str(&format!("{indent} */\n"));
    s
}

fn returns_flux(method_type: MethodType) -> bool {
    matches!(method_type, MethodType::ServerStream | MethodType::BiStream)
}

fn has_body_step(binding: &Binding) -> bool {
    binding.plan.steps.iter().any(|step| {
        matches!(
            step,
            TranscodeStep::MergeWholeBody | TranscodeStep::SetFromBodyField { .. }
        )
    })
}

fn uses_conversion(binding: &Binding, pred: fn(&str) -> bool) -> bool {
    binding.plan.steps.iter().any(|step| match step {
        TranscodeStep::SetFromPath { conversion, .. }
        | TranscodeStep::SetFromQuery { conversion, .. } => {
            matches!(conversion, Conversion::WellKnownString(name) if pred(name))
        }
        _ => false,
    })
}

fn is_timestamp(name: &str) -> bool {
    name.trim_start_matches('.') == "google.protobuf.Timestamp"
}

fn is_duration(name: &str) -> bool {
    name.trim_start_matches('.') == "google.protobuf.Duration"
}

fn is_field_mask(name: &str) -> bool {
    name.trim_start_matches('.') == "google.protobuf.FieldMask"
}

/// Simple name portion of a qualified type, for references within the same
/// package.
fn simple_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

impl Binding {
    /// The service method the handler delegates to: the route name without
    /// any additional-binding suffix.
    fn route_name_base(&self) -> String {
        use heck::ToLowerCamelCase;
        self.method_name.to_lower_camel_case()
    }
}
