//! gRPC layer - transport adapter over the survey service.

mod survey_grpc;

pub use survey_grpc::SurveyGrpcService;
