pub mod response_envelope;
