pub mod dao_vc_verifier;
