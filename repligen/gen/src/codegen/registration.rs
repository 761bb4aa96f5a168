//! Registration header listing every generated replicator.

use crate::cw_line;

use super::channel_data::ChannelDataNames;
use super::replicator::ReplicatorCodeUnit;
use super::{CodeWriter, GENERATED_BANNER};

/// Generates the registration header.
///
/// `channel_data` is set when a channel-data processor was generated; its
/// registration is emitted after the replicators.
pub fn generate_registration(
    units: &[ReplicatorCodeUnit],
    channel_data: Option<&ChannelDataNames>,
) -> String {
    let mut w = CodeWriter::cpp();

    w.line(GENERATED_BANNER);
    w.blank_line();
    w.line("#pragma once");
    w.blank_line();
    w.line("#include \"ChanneldReplication.h\"");
    for unit in units {
        w.line(&unit.include_code);
    }
    if let Some(names) = channel_data {
        cw_line!(w, "#include \"{}\"", names.header_file_name);
    }
    w.blank_line();

    w.block("namespace ChanneldGeneratedReplicators", |w| {
        w.block("static void RegisterAll()", |w| {
            for unit in units {
                w.line(&unit.register_code);
            }
            if let Some(names) = channel_data {
                cw_line!(
                    w,
                    "ChanneldReplication::RegisterChannelDataProcessor(TEXT(\"{}.{}\"), new {}::{}());",
                    names.proto_package,
                    names.message_name,
                    names.namespace,
                    names.processor_class
                );
            }
        });
    });

    w.finish()
}
