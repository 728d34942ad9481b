//! gRPC implementation for SurveyService.
//!
//! Every call gets its own [`CallContext`]; the service opens a session for
//! it and closes that session before the response is sent.

use std::sync::Arc;

use tonic::{Request, Response, Status};

use domain::{
    AnswerChanges, NewAnswer, NewQuestion, NewSurvey, NewUser, QuestionChanges, SurveyChanges,
    UserChanges,
};
use proto::survey::{
    survey_service_server::SurveyService as SurveyServiceProto, Answer, DeleteResponse,
    IdRequest, ListSurveysRequest, ListSurveysResponse, ListUsersRequest, ListUsersResponse,
    Question, Survey, User,
};

use crate::infra::CallContext;
use crate::service::SurveyService;

/// gRPC service wrapper for SurveyService.
pub struct SurveyGrpcService {
    service: Arc<dyn SurveyService>,
}

impl SurveyGrpcService {
    /// Create a new gRPC service wrapper.
    pub fn new(service: Arc<dyn SurveyService>) -> Self {
        Self { service }
    }
}

#[tonic::async_trait]
impl SurveyServiceProto for SurveyGrpcService {
    async fn create_survey(&self, request: Request<Survey>) -> Result<Response<Survey>, Status> {
        let req = request.into_inner();
        let mut ctx = CallContext::new();

        let input = NewSurvey {
            title: req.title.unwrap_or_default(),
            description: req.description,
            status: req.status,
        };

        let survey = self
            .service
            .create_survey(&mut ctx, input)
            .await
            .map_err(Status::from)?;
        Ok(Response::new(survey_to_proto(&survey)))
    }

    async fn get_survey(&self, request: Request<IdRequest>) -> Result<Response<Survey>, Status> {
        let req = request.into_inner();
        let mut ctx = CallContext::new();

        let survey = self
            .service
            .get_survey(&mut ctx, req.id)
            .await
            .map_err(Status::from)?;
        Ok(Response::new(survey_to_proto(&survey)))
    }

    async fn update_survey(&self, request: Request<Survey>) -> Result<Response<Survey>, Status> {
        let req = request.into_inner();
        let mut ctx = CallContext::new();

        let changes = SurveyChanges {
            id: req.id.unwrap_or_default(),
            title: req.title,
            description: req.description,
            status: req.status,
        };

        let survey = self
            .service
            .update_survey(&mut ctx, changes)
            .await
            .map_err(Status::from)?;
        Ok(Response::new(survey_to_proto(&survey)))
    }

    async fn delete_survey(
        &self,
        request: Request<IdRequest>,
    ) -> Result<Response<DeleteResponse>, Status> {
        let req = request.into_inner();
        let mut ctx = CallContext::new();

        let success = self
            .service
            .delete_survey(&mut ctx, req.id)
            .await
            .map_err(Status::from)?;
        Ok(Response::new(DeleteResponse { success }))
    }

    async fn list_surveys(
        &self,
        _request: Request<ListSurveysRequest>,
    ) -> Result<Response<ListSurveysResponse>, Status> {
        let mut ctx = CallContext::new();

        let surveys = self
            .service
            .list_surveys(&mut ctx)
            .await
            .map_err(Status::from)?;
        let total = count(surveys.len())?;
        let surveys: Vec<Survey> = surveys.iter().map(survey_to_proto).collect();

        Ok(Response::new(ListSurveysResponse { surveys, total }))
    }

    async fn create_question(
        &self,
        request: Request<Question>,
    ) -> Result<Response<Question>, Status> {
        let req = request.into_inner();
        let mut ctx = CallContext::new();

        let input = NewQuestion {
            survey_id: req.survey_id.unwrap_or_default(),
            text: req.text.unwrap_or_default(),
        };

        let question = self
            .service
            .create_question(&mut ctx, input)
            .await
            .map_err(Status::from)?;
        Ok(Response::new(question_to_proto(&question)))
    }

    async fn get_question(
        &self,
        request: Request<IdRequest>,
    ) -> Result<Response<Question>, Status> {
        let req = request.into_inner();
        let mut ctx = CallContext::new();

        let question = self
            .service
            .get_question(&mut ctx, req.id)
            .await
            .map_err(Status::from)?;
        Ok(Response::new(question_to_proto(&question)))
    }

    async fn update_question(
        &self,
        request: Request<Question>,
    ) -> Result<Response<Question>, Status> {
        let req = request.into_inner();
        let mut ctx = CallContext::new();

        let changes = QuestionChanges {
            id: req.id.unwrap_or_default(),
            survey_id: req.survey_id.unwrap_or_default(),
            text: req.text,
        };

        let question = self
            .service
            .update_question(&mut ctx, changes)
            .await
            .map_err(Status::from)?;
        Ok(Response::new(question_to_proto(&question)))
    }

    async fn delete_question(
        &self,
        request: Request<IdRequest>,
    ) -> Result<Response<DeleteResponse>, Status> {
        let req = request.into_inner();
        let mut ctx = CallContext::new();

        let success = self
            .service
            .delete_question(&mut ctx, req.id)
            .await
            .map_err(Status::from)?;
        Ok(Response::new(DeleteResponse { success }))
    }

    async fn create_user(&self, request: Request<User>) -> Result<Response<User>, Status> {
        let req = request.into_inner();
        let mut ctx = CallContext::new();

        let input = NewUser {
            name: req.name.unwrap_or_default(),
            last_name: req.last_name,
            email: req.email,
            gender: req.gender,
            phone: req.phone,
        };

        let user = self
            .service
            .create_user(&mut ctx, input)
            .await
            .map_err(Status::from)?;
        Ok(Response::new(user_to_proto(&user)))
    }

    async fn get_user(&self, request: Request<IdRequest>) -> Result<Response<User>, Status> {
        let req = request.into_inner();
        let mut ctx = CallContext::new();

        let user = self
            .service
            .get_user(&mut ctx, req.id)
            .await
            .map_err(Status::from)?;
        Ok(Response::new(user_to_proto(&user)))
    }

    async fn update_user(&self, request: Request<User>) -> Result<Response<User>, Status> {
        let req = request.into_inner();
        let mut ctx = CallContext::new();

        let changes = UserChanges {
            id: req.id.unwrap_or_default(),
            name: req.name,
            last_name: req.last_name,
            email: req.email,
            gender: req.gender,
            phone: req.phone,
        };

        let user = self
            .service
            .update_user(&mut ctx, changes)
            .await
            .map_err(Status::from)?;
        Ok(Response::new(user_to_proto(&user)))
    }

    async fn delete_user(
        &self,
        request: Request<IdRequest>,
    ) -> Result<Response<DeleteResponse>, Status> {
        let req = request.into_inner();
        let mut ctx = CallContext::new();

        let success = self
            .service
            .delete_user(&mut ctx, req.id)
            .await
            .map_err(Status::from)?;
        Ok(Response::new(DeleteResponse { success }))
    }

    async fn list_users(
        &self,
        _request: Request<ListUsersRequest>,
    ) -> Result<Response<ListUsersResponse>, Status> {
        let mut ctx = CallContext::new();

        let users = self
            .service
            .list_users(&mut ctx)
            .await
            .map_err(Status::from)?;
        let total = count(users.len())?;
        let users: Vec<User> = users.iter().map(user_to_proto).collect();

        Ok(Response::new(ListUsersResponse { users, total }))
    }

    async fn create_answer(&self, request: Request<Answer>) -> Result<Response<Answer>, Status> {
        let req = request.into_inner();
        let mut ctx = CallContext::new();

        let input = NewAnswer {
            question_id: req.question_id.unwrap_or_default(),
            user_id: req.user_id,
            text: req.text.unwrap_or_default(),
        };

        let answer = self
            .service
            .create_answer(&mut ctx, input)
            .await
            .map_err(Status::from)?;
        Ok(Response::new(answer_to_proto(&answer)))
    }

    async fn get_answer(&self, request: Request<IdRequest>) -> Result<Response<Answer>, Status> {
        let req = request.into_inner();
        let mut ctx = CallContext::new();

        let answer = self
            .service
            .get_answer(&mut ctx, req.id)
            .await
            .map_err(Status::from)?;
        Ok(Response::new(answer_to_proto(&answer)))
    }

    async fn update_answer(&self, request: Request<Answer>) -> Result<Response<Answer>, Status> {
        let req = request.into_inner();
        let mut ctx = CallContext::new();

        // question_id is not part of the changes; an answer never moves.
        let changes = AnswerChanges {
            id: req.id.unwrap_or_default(),
            user_id: req.user_id,
            text: req.text,
        };

        let answer = self
            .service
            .update_answer(&mut ctx, changes)
            .await
            .map_err(Status::from)?;
        Ok(Response::new(answer_to_proto(&answer)))
    }

    async fn delete_answer(
        &self,
        request: Request<IdRequest>,
    ) -> Result<Response<DeleteResponse>, Status> {
        let req = request.into_inner();
        let mut ctx = CallContext::new();

        let success = self
            .service
            .delete_answer(&mut ctx, req.id)
            .await
            .map_err(Status::from)?;
        Ok(Response::new(DeleteResponse { success }))
    }
}

/// Row count for a list response.
fn count(len: usize) -> Result<i32, Status> {
    i32::try_from(len).map_err(|_| Status::internal("Too many rows to count"))
}

/// Convert domain Survey to proto Survey.
fn survey_to_proto(survey: &domain::Survey) -> Survey {
    Survey {
        id: Some(survey.id),
        title: survey.title.clone(),
        description: survey.description.clone(),
        status: survey.status,
        created_at: survey.created_at.map(|dt| dt.to_rfc3339()),
    }
}

fn question_to_proto(question: &domain::Question) -> Question {
    Question {
        id: Some(question.id),
        survey_id: Some(question.survey_id),
        text: question.text.clone(),
    }
}

fn answer_to_proto(answer: &domain::Answer) -> Answer {
    Answer {
        id: Some(answer.id),
        question_id: Some(answer.question_id),
        user_id: answer.user_id,
        text: answer.text.clone(),
        recorded_at: answer.recorded_at.map(|dt| dt.to_rfc3339()),
    }
}

/// Convert domain User to proto User.
fn user_to_proto(user: &domain::User) -> User {
    User {
        id: Some(user.id),
        name: user.name.clone(),
        last_name: user.last_name.clone(),
        email: user.email.clone(),
        gender: user.gender.clone(),
        phone: user.phone.clone(),
        created_at: user.created_at.map(|dt| dt.to_rfc3339()),
    }
}
